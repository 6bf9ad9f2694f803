//! # 流程集成测试
//!
//! 测试 GameInput → GameCore → Notification 的完整链路。
//! 使用内存存储和手动回传的拉取器，不依赖任何真实资源。

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use adventure_core::{
    AssetFetcher, AssetHandle, AssetKey, Catalog, CoreConfig, FlagValue, GameCore, GameInput,
    GameMode, MemoryStore, Notification, SlotId,
};

const GAME: &str = r#"{
    "new_game": { "start_scene": "bedroom", "start_chapter": "ch1" },
    "items": [ { "id": "key", "name": "Brass key", "consumable": true } ],
    "scenes": [
        {
            "id": "bedroom",
            "preload_next": ["hall"],
            "interactables": [
                { "id": "door", "type": "scene_switch", "scene": "hall" },
                { "id": "key", "type": "pick_item", "item": "key" },
                { "id": "mom", "type": "dialogue", "dialogue": "mom" },
                { "id": "desk", "type": "subscene", "subscene": "desk_close" }
            ],
            "subscenes": [
                { "id": "desk_close", "interactables": [ { "id": "back", "type": "exit_subscene" } ] }
            ]
        },
        {
            "id": "hall",
            "interactables": [ { "id": "back", "type": "scene_switch", "scene": "bedroom" } ]
        }
    ],
    "dialogues": [
        {
            "id": "mom",
            "speaker": "Mom",
            "lines": [ { "text": "Morning." }, { "text": "Breakfast is ready." }, { "text": "Hurry up." } ],
            "on_complete": { "type": "set_flag", "flag": "talked_to_mom" }
        }
    ],
    "chapters": [
        { "id": "ch1", "next_chapter": "ch2", "nodes": [
            { "id": "A", "type": "wait", "on_complete": "B" },
            { "id": "B", "type": "flag_set", "flag": "morning", "on_complete": "chapter_complete" }
        ] },
        { "id": "ch2", "ending": true, "nodes": [
            { "id": "wake", "type": "wait", "on_complete": "gate" },
            { "id": "gate", "type": "wait", "flag": "talked_to_mom", "on_complete": "leave" },
            { "id": "leave", "type": "scene_load", "scene": "hall", "transition": true,
              "auto_advance": true, "on_complete": "chapter_complete" }
        ] }
    ]
}"#;

/// 记录请求，由测试手动回传
#[derive(Clone, Default)]
struct Fetcher {
    pending: Rc<RefCell<VecDeque<AssetKey>>>,
    next_handle: Rc<RefCell<u64>>,
}

impl AssetFetcher for Fetcher {
    fn request(&mut self, key: &AssetKey) {
        self.pending.borrow_mut().push_back(key.clone());
    }
}

struct Harness {
    core: GameCore,
    fetcher: Fetcher,
    store: MemoryStore,
    events: Vec<Notification>,
}

impl Harness {
    fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }

    /// 共享同一份存储，模拟重启进程
    fn with_store(store: MemoryStore) -> Self {
        let fetcher = Fetcher::default();
        let catalog = Catalog::from_json(GAME).unwrap();
        let mut core = GameCore::new(
            catalog,
            Box::new(store.clone()),
            Box::new(fetcher.clone()),
            &CoreConfig::default(),
        );
        core.boot();
        let mut harness = Self {
            core,
            fetcher,
            store,
            events: Vec::new(),
        };
        harness.collect();
        harness
    }

    fn collect(&mut self) {
        self.events.extend(self.core.drain_notifications());
    }

    fn send(&mut self, input: GameInput) {
        self.core.handle_input(input);
        self.collect();
    }

    /// 回传当前所有在途请求（不包括回传过程中新发起的）
    fn deliver(&mut self) {
        let pending: Vec<AssetKey> = self.fetcher.pending.borrow_mut().drain(..).collect();
        for key in pending {
            let handle = {
                let mut next = self.fetcher.next_handle.borrow_mut();
                *next += 1;
                AssetHandle(*next)
            };
            self.send(GameInput::fetched(key, handle));
        }
    }

    /// 回传直到没有在途请求
    fn deliver_all(&mut self) {
        while !self.fetcher.pending.borrow().is_empty() {
            self.deliver();
        }
    }

    fn take_events(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.events)
    }

    fn count(&self, predicate: impl Fn(&Notification) -> bool) -> usize {
        self.events.iter().filter(|n| predicate(n)).count()
    }

    fn position(&self, predicate: impl Fn(&Notification) -> bool) -> Option<usize> {
        self.events.iter().position(predicate)
    }

    fn start(&mut self) {
        self.send(GameInput::NewGame);
        self.deliver_all();
    }
}

/// 测试新游戏的初始进度
#[test]
fn test_new_game_starts_empty() {
    let mut h = Harness::new();
    assert_eq!(h.core.mode(), GameMode::Menu);
    h.start();

    assert_eq!(h.core.mode(), GameMode::Gameplay);
    assert!(h.core.save().get_inventory_list().is_empty());
    assert!(!h.core.save().has_item("key"));
    assert_eq!(h.core.scene_view().current_scene(), Some("bedroom"));
    assert_eq!(h.core.story().current_node(), Some("A"));
    assert!(h.events.contains(&Notification::SceneLoadComplete {
        scene_id: "bedroom".to_string()
    }));
    // 新游戏总会写入自动存档
    assert!(h.core.save().has_save(SlotId::Auto));
}

/// 测试重复拾取只生效一次
#[test]
fn test_pick_item_is_idempotent() {
    let mut h = Harness::new();
    h.start();
    h.take_events();

    h.send(GameInput::click("key"));
    h.send(GameInput::click("key"));

    assert_eq!(h.core.save().get_inventory_list(), ["key".to_string()]);
    assert_eq!(h.count(|n| matches!(n, Notification::InventoryUpdate)), 1);
    assert_eq!(
        h.count(|n| matches!(n, Notification::InteractableClicked { .. })),
        2
    );
}

/// 测试重复的模式切换只通知一次
#[test]
fn test_repeated_pause_notifies_once() {
    let mut h = Harness::new();
    h.start();
    h.take_events();

    h.send(GameInput::Pause);
    h.send(GameInput::Pause);
    assert_eq!(
        h.count(|n| matches!(n, Notification::GameStateChanged { .. })),
        1
    );
    h.send(GameInput::Resume);
    assert_eq!(h.core.mode(), GameMode::Gameplay);
}

/// 测试存档后在新进程中读档
#[test]
fn test_save_load_round_trip() {
    let mut first = Harness::new();
    first.start();
    first.send(GameInput::click("key"));
    first.send(GameInput::SetFlag {
        key: "quest".to_string(),
        value: FlagValue::Int(2),
    });
    first.send(GameInput::click("desk"));
    first.deliver_all();
    first.send(GameInput::SaveGame {
        slot: SlotId::Numbered(1),
    });
    assert!(first.events.contains(&Notification::SaveComplete {
        slot: SlotId::Numbered(1)
    }));
    let mut expected = first.core.save().state().unwrap().clone();

    let mut second = Harness::with_store(first.store.clone());
    second.send(GameInput::LoadGame {
        slot: SlotId::Numbered(1),
    });
    let loaded = second.core.save().state().unwrap().clone();
    expected.save_time = loaded.save_time;
    assert_eq!(loaded, expected);
    assert!(loaded.is_in_subscene);
    assert_eq!(second.core.mode(), GameMode::Gameplay);
    assert_eq!(second.core.story().current_chapter(), Some("ch1"));

    // 场景可见后重新进入子场景
    second.deliver_all();
    assert_eq!(second.core.scene_view().current_scene(), Some("bedroom"));
    assert_eq!(second.core.scene_view().current_subscene(), Some("desk_close"));
    assert!(second.core.save().is_in_subscene());
}

/// 测试读取不存在的槽位不改变任何状态
#[test]
fn test_load_missing_slot_keeps_state() {
    let mut h = Harness::new();
    h.start();
    h.send(GameInput::click("key"));
    let before = h.core.save().state().unwrap().clone();
    h.take_events();

    h.send(GameInput::LoadGame {
        slot: SlotId::Numbered(4),
    });
    assert_eq!(h.core.save().state(), Some(&before));
    assert_eq!(h.core.mode(), GameMode::Gameplay);
    assert_eq!(h.count(|n| matches!(n, Notification::LoadComplete { .. })), 0);
}

/// 测试损坏的存档
#[test]
fn test_corrupt_slot() {
    let mut h = Harness::new();
    h.store.insert_raw("MyGame_Save_slot_03", "{ not json");

    h.send(GameInput::LoadGame {
        slot: SlotId::Numbered(3),
    });
    assert_eq!(h.core.mode(), GameMode::Menu);
    assert!(h.core.save().state().is_none());

    let slots = h.core.save().list_slots();
    let info = slots
        .iter()
        .find(|s| s.slot_id == SlotId::Numbered(3))
        .unwrap();
    assert!(info.present);
    assert_eq!(info.scene_id, None);
}

/// 测试剧情图遍历：A -> B -> 章节完成
#[test]
fn test_story_traversal() {
    let mut h = Harness::new();
    h.start();
    h.take_events();

    h.send(GameInput::AdvanceStory);
    assert!(h.core.save().get_bool("morning"));
    h.send(GameInput::AdvanceStory);

    let node_b = h
        .position(|n| matches!(n, Notification::StoryNodeStarted { node_id } if node_id == "B"))
        .unwrap();
    let completed = h
        .position(|n| matches!(n, Notification::ChapterCompleted { chapter_id } if chapter_id == "ch1"))
        .unwrap();
    assert!(node_b < completed);

    // 下一章自动开始
    assert_eq!(h.core.story().current_chapter(), Some("ch2"));
    assert_eq!(h.core.story().current_node(), Some("wake"));
}

/// 测试连续两次切换场景只生效一次
#[test]
fn test_double_switch() {
    let mut h = Harness::new();
    h.start();
    h.take_events();

    h.send(GameInput::click("door"));
    h.send(GameInput::click("door"));
    assert_eq!(
        h.count(|n| matches!(n, Notification::SceneSwitchStart { .. })),
        1
    );

    h.send(GameInput::TransitionOutDone);
    h.send(GameInput::TransitionInDone);
    assert_eq!(h.core.scene_view().current_scene(), Some("hall"));
    assert_eq!(h.core.save().current_scene_id(), Some("hall"));
    assert_eq!(
        h.count(|n| matches!(n, Notification::SceneSwitchComplete { .. })),
        1
    );
    assert!(!h.core.scene_view().is_transition_overlay_active());
}

/// 测试三行对话
#[test]
fn test_three_line_dialogue() {
    let mut h = Harness::new();
    h.start();
    h.take_events();

    h.send(GameInput::click("mom"));
    assert_eq!(h.core.mode(), GameMode::Dialogue);
    for _ in 0..3 {
        h.send(GameInput::AdvanceDialogue);
    }

    let lines: Vec<(usize, usize)> = h
        .events
        .iter()
        .filter_map(|n| match n {
            Notification::DialogueLine(line) => Some((line.index, line.total)),
            _ => None,
        })
        .collect();
    assert_eq!(lines, vec![(0, 3), (1, 3), (2, 3)]);
    assert_eq!(h.count(|n| matches!(n, Notification::DialogueEnd { .. })), 1);
    assert_eq!(h.core.mode(), GameMode::Gameplay);
    assert!(h.core.save().is_dialogue_read("mom"));
}

/// 测试完整的第二章：对话写入的 Flag 放行等待节点，切换场景后到达结局
#[test]
fn test_dialogue_flag_unblocks_story_until_ending() {
    let mut h = Harness::new();
    h.start();
    h.send(GameInput::AdvanceStory);
    h.send(GameInput::AdvanceStory);
    h.send(GameInput::AdvanceStory);
    assert_eq!(h.core.story().current_node(), Some("gate"));
    h.take_events();

    h.send(GameInput::click("mom"));
    for _ in 0..3 {
        h.send(GameInput::AdvanceDialogue);
    }

    // DIALOGUE_END 先于剧情的反应
    let end = h
        .position(|n| matches!(n, Notification::DialogueEnd { .. }))
        .unwrap();
    let leave = h
        .position(|n| matches!(n, Notification::StoryNodeStarted { node_id } if node_id == "leave"))
        .unwrap();
    assert!(end < leave);
    assert_eq!(h.core.scene_view().staged_scene(), Some("hall"));

    h.send(GameInput::TransitionOutDone);
    h.send(GameInput::TransitionInDone);
    assert_eq!(h.core.mode(), GameMode::GameOver);
    assert!(h.events.contains(&Notification::ChapterCompleted {
        chapter_id: "ch2".to_string()
    }));
}

/// 测试已为真的 Flag 让等待节点立即放行
#[test]
fn test_wait_on_truthy_flag_passes_through() {
    let mut h = Harness::new();
    h.start();
    h.send(GameInput::SetFlag {
        key: "talked_to_mom".to_string(),
        value: FlagValue::Bool(true),
    });
    h.send(GameInput::JumpToNode {
        node_id: "B".to_string(),
    });
    h.send(GameInput::AdvanceStory);
    assert_eq!(h.core.story().current_chapter(), Some("ch2"));

    h.send(GameInput::AdvanceStory);
    assert_eq!(h.core.story().current_node(), Some("leave"));
}

/// 测试物品选中与使用
#[test]
fn test_select_and_use_item() {
    let mut h = Harness::new();
    h.start();
    h.send(GameInput::click("key"));
    h.send(GameInput::SelectItem {
        item_id: Some("key".to_string()),
    });
    assert_eq!(h.core.selected_item(), Some("key"));

    h.send(GameInput::UseSelectedItem {
        interactable_id: "door".to_string(),
    });
    assert!(h.core.save().is_item_used("key"));
    // 消耗品使用后取消选中，但仍在物品栏中
    assert_eq!(h.core.selected_item(), None);
    assert!(h.core.save().has_item("key"));
}

/// 测试子场景进出
#[test]
fn test_subscene_round_trip() {
    let mut h = Harness::new();
    h.start();

    h.send(GameInput::click("desk"));
    h.deliver();
    assert_eq!(h.core.scene_view().current_subscene(), Some("desk_close"));
    assert_eq!(h.core.mode(), GameMode::Gameplay);

    // 子场景中只能点到子场景自己的交互物
    h.send(GameInput::click("door"));
    assert_eq!(
        h.count(|n| matches!(n, Notification::SceneSwitchStart { .. })),
        0
    );

    h.send(GameInput::click("back"));
    assert_eq!(h.core.scene_view().current_subscene(), None);
    assert!(!h.core.save().is_in_subscene());
    assert_eq!(h.count(|n| matches!(n, Notification::SubsceneExit { .. })), 1);
}

/// 测试回到主菜单
#[test]
fn test_quit_to_menu_autosaves() {
    let mut h = Harness::new();
    h.start();
    h.send(GameInput::click("key"));
    h.send(GameInput::QuitToMenu);

    assert_eq!(h.core.mode(), GameMode::Menu);
    assert!(!h.core.save().has_active_state());
    assert_eq!(h.core.scene_view().current_scene(), None);
    let auto = h.core.save().read_slot(SlotId::Auto).unwrap();
    assert_eq!(auto.inventory, vec!["key".to_string()]);
    assert_eq!(h.core.cache_stats().entries, 0);
}

/// 测试删除当前会话的存档
#[test]
fn test_delete_active_slot_returns_to_menu() {
    let mut h = Harness::new();
    h.start();
    h.send(GameInput::SaveGame {
        slot: SlotId::Numbered(2),
    });
    h.send(GameInput::DeleteSave {
        slot: SlotId::Numbered(2),
    });

    assert!(h.events.contains(&Notification::SaveDeleted {
        slot: SlotId::Numbered(2)
    }));
    assert!(!h.core.save().has_save(SlotId::Numbered(2)));
    assert_eq!(h.core.mode(), GameMode::Menu);
}

/// 测试新游戏还没手动存档时删除 auto 槽位
#[test]
fn test_delete_auto_ends_unsaved_session() {
    let mut h = Harness::new();
    h.start();
    h.send(GameInput::DeleteSave { slot: SlotId::Auto });

    assert!(!h.core.save().has_save(SlotId::Auto));
    assert!(!h.core.save().has_active_state());
    assert_eq!(h.core.mode(), GameMode::Menu);
}

/// 测试场景资源加载失败
#[test]
fn test_scene_fetch_failure() {
    let mut h = Harness::new();
    h.send(GameInput::NewGame);
    let pending: Vec<AssetKey> = h.fetcher.pending.borrow_mut().drain(..).collect();
    for key in pending {
        h.send(GameInput::fetch_failed(key, "disk error"));
    }

    assert!(h
        .events
        .iter()
        .any(|n| matches!(n, Notification::LoadFailed { cause, .. } if cause == "disk error")));
    assert_eq!(h.core.scene_view().current_scene(), None);
    assert_eq!(h.core.mode(), GameMode::Gameplay);
}
