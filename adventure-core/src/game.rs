//! # Game 模块
//!
//! 组合根：构造并持有所有组件，把宿主输入分发给它们，并串起组件之间的反应。
//!
//! ## 执行模型
//!
//! ```text
//! handle_input(input) ──▶ 任务队列 ──▶ 逐个执行到底 ──▶ drain_notifications()
//! ```
//!
//! 1. 输入先入队，再按 FIFO 顺序逐个执行
//! 2. 组件的结果（对话结束、场景可见、Flag 变化等）作为新任务排到队尾
//! 3. 一个任务执行完之前不会开始下一个，同一份进度不会被交错修改
//!
//! 因此 `DIALOGUE_END` 总是先于剧情对该对话的反应发出。
//!
//! 暂停期间剧情任务不执行，先放进延后队列，`resume()` 时按原顺序接回任务队列。
//! 对话进行中剧情要求的新对话排在当前对话之后，不会替换它。

use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, DiagnosticLevel, InteractionAction, NodeAction};
use crate::config::CoreConfig;
use crate::dialogue::{DialogueFinished, DialogueRunner};
use crate::error::LoadError;
use crate::input::GameInput;
use crate::interaction::{InteractionRouter, ViewHandle};
use crate::inventory::ItemSelection;
use crate::mode::GameMode;
use crate::notification::Notification;
use crate::resources::{
    AssetFetcher, AssetHandle, AssetKey, CacheStats, LoadRequest, LoadTicket, Resolution,
    ResourceLoader,
};
use crate::save::SlotId;
use crate::save_manager::{SaveManager, VISITED_FLAG_PREFIX};
use crate::scene_view::{SceneEvent, SceneView};
use crate::services::Services;
use crate::state::FlagValue;
use crate::store::KeyValueStore;
use crate::story::{StoryEvent, StoryRunner, StoryStep};

/// 排队执行的任务
#[derive(Debug)]
enum Task {
    Input(GameInput),
    /// 告知剧情一个事件，匹配时推进
    Story(StoryEvent),
    AdvanceStory,
    StartChapter(String),
    JumpToNode(String),
    /// 排队等待的对话
    ShowDialogue(String),
}

impl Task {
    /// 会推动剧情、可能改变模式的任务
    fn is_story(&self) -> bool {
        !matches!(self, Task::Input(_))
    }
}

/// 进行中的过场
#[derive(Debug)]
struct Cutscene {
    video: String,
    /// 结束后恢复的模式
    resume_mode: GameMode,
    /// 视频还在拉取
    ticket: Option<LoadTicket>,
}

/// 游戏核心
#[derive(Debug)]
pub struct GameCore {
    sv: Services,
    scene: SceneView,
    dialogue: DialogueRunner,
    story: StoryRunner,
    router: InteractionRouter,
    selection: ItemSelection,
    tasks: VecDeque<Task>,
    /// 暂停期间延后的剧情任务
    deferred: VecDeque<Task>,
    /// 等当前对话结束再开始的对话
    queued_dialogues: VecDeque<String>,
    cutscene: Option<Cutscene>,
    /// 暂停前的模式
    paused_from: Option<GameMode>,
    /// 打开嵌套界面前的模式
    overlay_from: Option<GameMode>,
    /// 背景图请求：凭据 -> 路径
    backgrounds: HashMap<LoadTicket, String>,
    /// 已放弃的凭据，结果到达后直接释放
    abandoned: HashSet<LoadTicket>,
}

impl GameCore {
    /// 创建游戏核心
    ///
    /// # 参数
    ///
    /// - `catalog`: 已解析的内容目录
    /// - `store`: 存档后端
    /// - `fetcher`: 宿主的资源拉取原语
    /// - `config`: 核心配置
    pub fn new(
        catalog: Catalog,
        store: Box<dyn KeyValueStore>,
        fetcher: Box<dyn AssetFetcher>,
        config: &CoreConfig,
    ) -> Self {
        let save = SaveManager::new(store, config);
        let loader = ResourceLoader::new(fetcher);
        Self {
            sv: Services::new(catalog, save, loader),
            scene: SceneView::new(),
            dialogue: DialogueRunner::new(),
            story: StoryRunner::new(),
            router: InteractionRouter::new(),
            selection: ItemSelection::new(),
            tasks: VecDeque::new(),
            deferred: VecDeque::new(),
            queued_dialogues: VecDeque::new(),
            cutscene: None,
            paused_from: None,
            overlay_from: None,
            backgrounds: HashMap::new(),
            abandoned: HashSet::new(),
        }
    }

    /// 启动：检查内容目录并进入主菜单
    pub fn boot(&mut self) {
        let diagnostics = self.sv.catalog.validate();
        for d in diagnostics.filter_by_level(DiagnosticLevel::Warn) {
            warn!(diagnostic = %d, "内容目录问题");
        }
        if self.sv.mode() == GameMode::Init {
            self.sv.set_mode(GameMode::Menu);
        }
    }

    /// 处理一个输入，执行到队列清空为止
    pub fn handle_input(&mut self, input: GameInput) {
        self.tasks.push_back(Task::Input(input));
        self.run_tasks();
    }

    /// 取走所有待发出的通知
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.sv.outbox.drain()
    }

    // ── 查询 ──

    pub fn mode(&self) -> GameMode {
        self.sv.mode()
    }

    pub fn services(&self) -> &Services {
        &self.sv
    }

    pub fn catalog(&self) -> &Catalog {
        &self.sv.catalog
    }

    pub fn save(&self) -> &SaveManager {
        &self.sv.save
    }

    pub fn scene_view(&self) -> &SceneView {
        &self.scene
    }

    pub fn story(&self) -> &StoryRunner {
        &self.story
    }

    pub fn dialogue(&self) -> &DialogueRunner {
        &self.dialogue
    }

    pub fn selected_item(&self) -> Option<&str> {
        self.selection.selected()
    }

    pub fn cutscene_video(&self) -> Option<&str> {
        self.cutscene.as_ref().map(|c| c.video.as_str())
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.sv.loader.stats()
    }

    // ── 表现层注册 ──

    pub fn register_interactable(
        &mut self,
        interactable_id: impl Into<String>,
        kind: impl Into<String>,
        handle: ViewHandle,
    ) {
        self.router.register_interactable(interactable_id, kind, handle);
    }

    pub fn unregister_interactable(&mut self, interactable_id: &str) {
        self.router.unregister_interactable(interactable_id);
    }

    pub fn show_interactable(&mut self, interactable_id: &str) {
        self.router.show(interactable_id, &mut self.sv);
    }

    pub fn hide_interactable(&mut self, interactable_id: &str) {
        self.router.hide(interactable_id, &mut self.sv);
    }

    /// 写入交互物状态
    pub fn set_interactable_state(&mut self, interactable_id: &str, value: serde_json::Value) -> bool {
        self.sv
            .save
            .set_interactable_state(interactable_id, value, &mut self.sv.outbox)
    }

    // ── 背景图 ──

    /// 请求背景图，就绪时发出 `BACKGROUND_READY`
    pub fn request_background(&mut self, path: &str) {
        match self.sv.loader.load_background(path) {
            LoadRequest::Ready(handle) => self.sv.emit(Notification::BackgroundReady {
                path: path.to_string(),
                handle,
            }),
            LoadRequest::Pending(ticket) => {
                self.backgrounds.insert(ticket, path.to_string());
            }
        }
    }

    pub fn release_background(&mut self, path: &str) {
        self.sv.loader.release(&AssetKey::background(path));
    }

    // ── 任务执行 ──

    fn run_tasks(&mut self) {
        while let Some(task) = self.tasks.pop_front() {
            self.run(task);
        }
    }

    fn run(&mut self, task: Task) {
        if task.is_story() && self.sv.mode() == GameMode::Paused {
            debug!(task = ?task, "暂停中，剧情任务延后");
            self.deferred.push_back(task);
            return;
        }
        match task {
            Task::Input(input) => self.dispatch(input),
            Task::Story(event) => {
                if self.story.notify(&event, &self.sv) {
                    debug!(event = ?event, "剧情推进");
                    self.tasks.push_back(Task::AdvanceStory);
                }
            }
            Task::AdvanceStory => {
                let step = self.story.advance(&mut self.sv);
                self.apply_step(step);
            }
            Task::StartChapter(chapter_id) => {
                // 错误已在 StoryRunner 中记录
                let _ = self.story.start_chapter(&chapter_id, &mut self.sv);
            }
            Task::JumpToNode(node_id) => {
                let step = self.story.jump_to_node(&node_id, &mut self.sv);
                self.apply_step(step);
            }
            Task::ShowDialogue(dialogue_id) => self.show_dialogue(&dialogue_id),
        }
    }

    fn dispatch(&mut self, input: GameInput) {
        debug!(input = ?input, mode = ?self.sv.mode(), "处理输入");
        match input {
            GameInput::InteractableClicked { interactable_id } => self.on_click(&interactable_id),
            GameInput::AdvanceDialogue => {
                if let Some(finished) = self.dialogue.next_line(&mut self.sv) {
                    self.on_dialogue_finished(finished);
                }
            }
            GameInput::SelectChoice { index } => {
                if let Some(finished) = self.dialogue.select_choice(index, &mut self.sv) {
                    self.on_dialogue_finished(finished);
                }
            }
            GameInput::SelectItem { item_id } => {
                self.selection.select(item_id.as_deref(), &mut self.sv);
            }
            GameInput::UseSelectedItem { interactable_id } => {
                self.selection.use_selected(&interactable_id, &mut self.sv);
            }
            GameInput::Pause => self.pause(),
            GameInput::Resume => self.resume(),
            GameInput::QuitToMenu => self.quit_to_menu(),
            GameInput::NewGame => self.new_game(),
            GameInput::LoadGame { slot } => self.load_game(slot),
            GameInput::SaveGame { slot } => {
                if let Err(e) = self.sv.save.save_game(slot, false, &mut self.sv.outbox) {
                    warn!(slot = %slot, error = %e, "存档失败");
                }
            }
            GameInput::DeleteSave { slot } => self.delete_save(slot),
            GameInput::FinishIntro => {
                if self.sv.mode() == GameMode::IntroInteract {
                    self.sv.set_mode(GameMode::Gameplay);
                }
            }
            GameInput::AdvanceStory => self.tasks.push_back(Task::AdvanceStory),
            GameInput::JumpToNode { node_id } => self.tasks.push_back(Task::JumpToNode(node_id)),
            GameInput::SetFlag { key, value } => self.set_flag(&key, value),
            GameInput::OpenOverlay => self.open_overlay(),
            GameInput::CloseOverlay => self.close_overlay(),
            GameInput::TransitionOutDone => self.scene.transition_out_done(&mut self.sv),
            GameInput::TransitionInDone => {
                if let Some(event) = self.scene.transition_in_done(&mut self.sv) {
                    self.on_scene_visible(event);
                }
            }
            GameInput::CutsceneFinished => self.finish_cutscene(),
            GameInput::AssetFetched { asset, result } => self.on_asset_fetched(asset, result),
        }
    }

    // ── 交互 ──

    fn on_click(&mut self, interactable_id: &str) {
        let Some(action) = self.router.handle_click(interactable_id, &self.sv) else {
            return;
        };
        // 对话中的点击只推进文字
        if matches!(action, InteractionAction::Dialogue { .. }) && self.dialogue.is_active() {
            debug!(interactable_id, "对话进行中，忽略打开新对话的点击");
            return;
        }
        match action {
            InteractionAction::Dialogue { dialogue } => self.show_dialogue(&dialogue),
            InteractionAction::PickItem { item } => {
                self.sv.save.add_item(&item, &mut self.sv.outbox);
            }
            InteractionAction::SceneSwitch { scene } => {
                self.scene.switch_to_scene(&scene, &mut self.sv);
            }
            InteractionAction::Subscene { subscene } => {
                if let Err(e) = self.scene.enter_subscene(&subscene, &mut self.sv) {
                    warn!(interactable_id, error = %e, "交互物指向的子场景无效");
                }
            }
            InteractionAction::ExitSubscene => {
                self.scene.exit_subscene(&mut self.sv);
            }
            InteractionAction::Animation { animation } => {
                self.sv.emit(Notification::PlayAnimation { animation });
            }
            InteractionAction::Custom { name, data } => {
                self.sv.emit(Notification::CustomEvent { name, data });
            }
        }
        self.sv.emit(Notification::InteractableClicked {
            interactable_id: interactable_id.to_string(),
        });
    }

    // ── 对话 / Flag ──

    fn show_dialogue(&mut self, dialogue_id: &str) {
        if self.dialogue.is_active() {
            debug!(dialogue_id, "已有对话进行中，排在其后");
            self.queued_dialogues.push_back(dialogue_id.to_string());
            return;
        }
        // 对话不存在时 DialogueRunner 已告警
        if let Ok(Some(finished)) = self.dialogue.show_dialogue(dialogue_id, &mut self.sv) {
            self.on_dialogue_finished(finished);
        }
    }

    fn on_dialogue_finished(&mut self, finished: DialogueFinished) {
        self.tasks
            .push_back(Task::Story(StoryEvent::DialogueEnded(finished.dialogue_id)));
        for flag in finished.flags_written {
            self.tasks.push_back(Task::Story(StoryEvent::FlagChanged(flag)));
        }
        if let Some(next) = self.queued_dialogues.pop_front() {
            self.tasks.push_back(Task::ShowDialogue(next));
        }
    }

    fn set_flag(&mut self, key: &str, value: FlagValue) {
        if self.sv.save.set_flag(key, value, &mut self.sv.outbox) {
            self.tasks
                .push_back(Task::Story(StoryEvent::FlagChanged(key.to_string())));
        }
    }

    // ── 剧情 ──

    fn apply_step(&mut self, step: StoryStep) {
        match step {
            StoryStep::Execute { node_id, action } => {
                debug!(node_id = %node_id, action = ?action, "执行剧情节点");
                self.execute_node(action);
            }
            StoryStep::ChapterCompleted {
                chapter_id,
                next_chapter,
                ending,
            } => {
                if ending {
                    info!(chapter_id = %chapter_id, "到达结局");
                    self.sv.set_mode(GameMode::GameOver);
                } else if let Some(next) = next_chapter {
                    self.tasks.push_back(Task::StartChapter(next));
                }
            }
            StoryStep::Halted => {}
        }
    }

    fn execute_node(&mut self, action: NodeAction) {
        match action {
            NodeAction::SceneLoad { scene, transition } => {
                if self.scene.current_scene() == Some(scene.as_str()) {
                    self.tasks
                        .push_back(Task::Story(StoryEvent::SceneVisible(scene)));
                } else if transition {
                    self.scene.switch_to_scene(&scene, &mut self.sv);
                } else {
                    match self.scene.load_scene(&scene, &mut self.sv) {
                        Ok(Some(event)) => self.on_scene_visible(event),
                        Ok(None) => {}
                        Err(e) => warn!(error = %e, "剧情节点的场景无效"),
                    }
                }
            }
            NodeAction::Cutscene { video } => self.start_cutscene(&video),
            NodeAction::Dialogue { dialogue } => self.show_dialogue(&dialogue),
            NodeAction::FlagSet { flag, value } => {
                self.set_flag(&flag, value);
                self.tasks
                    .push_back(Task::Story(StoryEvent::FlagWritten(flag)));
            }
            NodeAction::Wait { flag: None } => self.tasks.push_back(Task::AdvanceStory),
            // 已经为真的 Flag 立即放行
            NodeAction::Wait { flag: Some(flag) } => {
                if self.sv.save.get_bool(&flag) {
                    self.tasks
                        .push_back(Task::Story(StoryEvent::FlagChanged(flag)));
                }
            }
        }
    }

    fn on_scene_visible(&mut self, event: SceneEvent) {
        let scene_id = event.scene_id().to_string();
        if self.sv.save.check_first_visit(&scene_id, &mut self.sv.outbox) {
            self.tasks.push_back(Task::Story(StoryEvent::FlagChanged(format!(
                "{}{}",
                VISITED_FLAG_PREFIX, scene_id
            ))));
        }
        self.tasks
            .push_back(Task::Story(StoryEvent::SceneVisible(scene_id)));
    }

    // ── 过场 ──

    fn start_cutscene(&mut self, video: &str) {
        if self.cutscene.is_some() {
            warn!(video, "上一个过场尚未结束，先结束它");
            self.finish_cutscene();
        }

        let resume_mode = match self.sv.mode() {
            GameMode::Cutscene | GameMode::Paused | GameMode::Init | GameMode::Menu => {
                GameMode::Gameplay
            }
            other => other,
        };
        self.sv.set_mode(GameMode::Cutscene);
        info!(video, "过场开始");

        let ticket = match self.sv.loader.load_video(video) {
            LoadRequest::Ready(_) => {
                self.sv.emit(Notification::CutsceneStart {
                    video: video.to_string(),
                });
                None
            }
            LoadRequest::Pending(ticket) => Some(ticket),
        };
        self.cutscene = Some(Cutscene {
            video: video.to_string(),
            resume_mode,
            ticket,
        });
    }

    /// 结束过场：发出 `CUTSCENE_END`，释放视频，恢复模式，告知剧情
    fn finish_cutscene(&mut self) {
        let Some(cutscene) = self.cutscene.take() else {
            debug!("没有进行中的过场");
            return;
        };
        match cutscene.ticket {
            Some(ticket) => {
                self.abandoned.insert(ticket);
            }
            None => self.sv.loader.release_video(&cutscene.video),
        }
        info!(video = %cutscene.video, "过场结束");
        self.sv.emit(Notification::CutsceneEnd {
            video: cutscene.video.clone(),
        });

        match self.sv.mode() {
            GameMode::Cutscene => {
                self.sv.set_mode(cutscene.resume_mode);
            }
            GameMode::Paused if self.paused_from == Some(GameMode::Cutscene) => {
                self.paused_from = Some(cutscene.resume_mode);
            }
            _ => {}
        }
        self.tasks
            .push_back(Task::Story(StoryEvent::CutsceneEnded(cutscene.video)));
    }

    fn on_video_loaded(&mut self, resolution: &Resolution) {
        match &resolution.result {
            Ok(_) => {
                if let Some(cutscene) = self.cutscene.as_mut() {
                    cutscene.ticket = None;
                    let video = cutscene.video.clone();
                    self.sv.emit(Notification::CutsceneStart { video });
                }
            }
            Err(e) => {
                warn!(error = %e, "过场视频加载失败");
                if let Some(cutscene) = self.cutscene.as_mut() {
                    cutscene.ticket = None;
                }
                self.emit_load_failed(resolution);
                // 视频没有进缓存，结束时不释放
                if let Some(cutscene) = self.cutscene.take() {
                    self.sv.emit(Notification::CutsceneEnd {
                        video: cutscene.video.clone(),
                    });
                    if self.sv.mode() == GameMode::Cutscene {
                        self.sv.set_mode(cutscene.resume_mode);
                    } else if self.paused_from == Some(GameMode::Cutscene) {
                        self.paused_from = Some(cutscene.resume_mode);
                    }
                    self.tasks
                        .push_back(Task::Story(StoryEvent::CutsceneEnded(cutscene.video)));
                }
            }
        }
    }

    // ── 资源回传 ──

    fn on_asset_fetched(&mut self, asset: AssetKey, result: Result<AssetHandle, String>) {
        for resolution in self.sv.loader.complete(&asset, result) {
            let ticket = resolution.ticket;
            if self.scene.owns(ticket) {
                if let Some(event) = self.scene.on_asset_loaded(&resolution, &mut self.sv) {
                    self.on_scene_visible(event);
                }
            } else if self
                .cutscene
                .as_ref()
                .is_some_and(|c| c.ticket == Some(ticket))
            {
                self.on_video_loaded(&resolution);
            } else if let Some(path) = self.backgrounds.remove(&ticket) {
                match resolution.result {
                    Ok(handle) => self.sv.emit(Notification::BackgroundReady { path, handle }),
                    Err(_) => self.emit_load_failed(&resolution),
                }
            } else if self.abandoned.remove(&ticket) {
                if resolution.result.is_ok() {
                    self.sv.loader.release(&resolution.key);
                }
            } else {
                warn!(asset = %resolution.key, "无人认领的加载结果，释放");
                if resolution.result.is_ok() {
                    self.sv.loader.release(&resolution.key);
                }
            }
        }
    }

    fn emit_load_failed(&mut self, resolution: &Resolution) {
        if let Err(e) = &resolution.result {
            let LoadError::FetchFailed { asset, cause } = e;
            self.sv.emit(Notification::LoadFailed {
                asset: asset.clone(),
                cause: cause.clone(),
            });
        }
    }

    // ── 模式 ──

    fn pause(&mut self) {
        let mode = self.sv.mode();
        if !mode.can_pause() {
            debug!(mode = ?mode, "当前模式不能暂停");
            return;
        }
        self.paused_from = Some(mode);
        self.sv.set_mode(GameMode::Paused);
    }

    fn resume(&mut self) {
        if self.sv.mode() != GameMode::Paused {
            return;
        }
        let mode = self.paused_from.take().unwrap_or(GameMode::Gameplay);
        self.sv.set_mode(mode);
        if !self.deferred.is_empty() {
            debug!(count = self.deferred.len(), "恢复延后的剧情任务");
            self.tasks.extend(self.deferred.drain(..));
        }
    }

    fn open_overlay(&mut self) {
        let mode = self.sv.mode();
        if !matches!(mode, GameMode::Gameplay | GameMode::IntroInteract) {
            debug!(mode = ?mode, "当前模式不能打开嵌套界面");
            return;
        }
        self.overlay_from = Some(mode);
        self.sv.set_mode(GameMode::Subscene);
    }

    fn close_overlay(&mut self) {
        if self.sv.mode() != GameMode::Subscene {
            return;
        }
        let mode = self.overlay_from.take().unwrap_or(GameMode::Gameplay);
        self.sv.set_mode(mode);
    }

    // ── 会话 ──

    fn new_game(&mut self) {
        self.reset_session();
        let new_game = self.sv.catalog.new_game().clone();
        self.sv.save.start_new_game(&new_game.start_scene);

        match self.scene.load_scene(&new_game.start_scene, &mut self.sv) {
            Ok(Some(event)) => self.on_scene_visible(event),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "起始场景无效"),
        }
        if let Some(chapter_id) = &new_game.start_chapter {
            // 错误已在 StoryRunner 中记录
            let _ = self.story.start_chapter(chapter_id, &mut self.sv);
        }
        self.sv.set_mode(if new_game.intro {
            GameMode::IntroInteract
        } else {
            GameMode::Gameplay
        });
    }

    fn load_game(&mut self, slot: SlotId) {
        if !self.sv.save.load_game(slot, &mut self.sv.outbox) {
            return;
        }
        self.reset_interpreters();

        let Some(state) = self.sv.save.state() else {
            return;
        };
        let scene_id = state.current_scene_id.clone();
        let subscene = state.current_subscene_id.clone();
        let chapter_id = state.current_chapter_id.clone();
        let node_id = state.current_story_node_id.clone();

        let mut replay = None;
        if !chapter_id.is_empty() {
            match self.story.restore(&chapter_id, &node_id, &self.sv) {
                Ok(action) => replay = action,
                Err(e) => warn!(error = %e, "存档中的剧情位置无效"),
            }
        }
        self.sv.set_mode(GameMode::Gameplay);

        match self
            .scene
            .load_scene_restoring(&scene_id, subscene, &mut self.sv)
        {
            Ok(Some(event)) => self.on_scene_visible(event),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "存档中的场景无效"),
        }

        // 存档停在对话或过场中途，重新播放该节点
        if let Some(action) = replay {
            debug!(node_id = %node_id, "重新播放存档所在节点");
            self.execute_node(action);
        }
    }

    fn delete_save(&mut self, slot: SlotId) {
        let had_session = self.sv.save.has_active_state();
        match self.sv.save.delete_save(slot, &mut self.sv.outbox) {
            Ok(()) => {
                if had_session && !self.sv.save.has_active_state() {
                    self.reset_session();
                    self.sv.set_mode(GameMode::Menu);
                }
            }
            Err(e) => warn!(slot = %slot, error = %e, "删除存档失败"),
        }
    }

    fn quit_to_menu(&mut self) {
        if !self.sv.mode().is_in_game() {
            return;
        }
        if self.sv.save.has_active_state()
            && let Err(e) = self.sv.save.save_game(SlotId::Auto, true, &mut self.sv.outbox)
        {
            warn!(error = %e, "退出前自动存档失败");
        }
        self.reset_session();
        self.sv.save.close_session();
        self.sv.set_mode(GameMode::Menu);
    }

    /// 清空对话、剧情、过场、选中、暂停状态和所有排队的任务
    fn reset_interpreters(&mut self) {
        self.dialogue.reset();
        self.story.reset();
        self.selection.clear();
        if let Some(cutscene) = self.cutscene.take() {
            match cutscene.ticket {
                Some(ticket) => {
                    self.abandoned.insert(ticket);
                }
                None => self.sv.loader.release_video(&cutscene.video),
            }
        }
        self.paused_from = None;
        self.overlay_from = None;
        // 上一局剩下的反应不再执行
        self.tasks.clear();
        self.deferred.clear();
        self.queued_dialogues.clear();
    }

    fn reset_session(&mut self) {
        self.reset_interpreters();
        self.scene.reset(&mut self.sv);
        self.router.clear();
    }
}
