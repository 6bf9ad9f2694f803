//! # SaveManager 模块
//!
//! 持有唯一的 [`PlayState`]，负责所有进度修改和槽位读写。
//!
//! ## 约定
//!
//! - 新游戏或读档成功之前没有激活的进度：查询返回默认值，修改静默忽略
//! - 每个修改方法都会发出对应通知；开启 `auto_save` 时再静默写入 auto 槽位
//! - 读档失败（不存在 / 损坏）不改变当前进度
//! - 版本不一致只告警，照常读档

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::CoreConfig;
use crate::error::SaveError;
use crate::notification::{Notification, Outbox};
use crate::save::{SaveSlotInfo, SlotId, decode_record, encode_record};
use crate::state::{FlagValue, PlayState, SCHEMA_VERSION};
use crate::store::KeyValueStore;

/// 首次访问标记的前缀
pub const VISITED_FLAG_PREFIX: &str = "VISITED_";

/// 存档管理器
pub struct SaveManager {
    store: Box<dyn KeyValueStore>,
    namespace: String,
    auto_save: bool,
    slot_count: u8,
    /// 激活的进度
    active: Option<PlayState>,
    /// 激活进度对应的槽位：新游戏为 auto，之后是最近一次读档 / 手动存档的槽位
    active_slot: Option<SlotId>,
}

impl std::fmt::Debug for SaveManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveManager")
            .field("namespace", &self.namespace)
            .field("auto_save", &self.auto_save)
            .field("active_slot", &self.active_slot)
            .field("active", &self.active.is_some())
            .finish_non_exhaustive()
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

impl SaveManager {
    pub fn new(store: Box<dyn KeyValueStore>, config: &CoreConfig) -> Self {
        Self {
            store,
            namespace: config.save_namespace.clone(),
            auto_save: config.auto_save,
            slot_count: config.effective_slot_count(),
            active: None,
            active_slot: None,
        }
    }

    // ── 会话 ──

    /// 是否有激活的进度
    pub fn has_active_state(&self) -> bool {
        self.active.is_some()
    }

    /// 激活的进度（只读）
    pub fn state(&self) -> Option<&PlayState> {
        self.active.as_ref()
    }

    pub fn active_slot(&self) -> Option<SlotId> {
        self.active_slot
    }

    pub fn slot_count(&self) -> u8 {
        self.slot_count
    }

    /// 开始新游戏：以起始场景创建全新进度，并静默写入 auto 槽位
    pub fn start_new_game(&mut self, start_scene: &str) {
        let now = now_millis();
        let mut state = PlayState::new(format!("save_{}", now), start_scene);
        state.save_time = now;
        info!(save_id = %state.save_id, start_scene, "开始新游戏");

        self.active = Some(state);
        // 新游戏在手动存档之前只有 auto 槽位这一份
        self.active_slot = Some(SlotId::Auto);
        self.write_auto();
    }

    /// 结束当前会话（回到主菜单时调用）
    pub fn close_session(&mut self) {
        if self.active.take().is_some() {
            debug!("会话已关闭");
        }
        self.active_slot = None;
    }

    // ── 槽位读写 ──

    fn check_slot(&self, slot: SlotId) -> Result<(), SaveError> {
        if slot.is_valid(self.slot_count) {
            Ok(())
        } else {
            Err(SaveError::InvalidSlot(slot.to_string()))
        }
    }

    fn key_of(&self, slot: SlotId) -> String {
        slot.storage_key(&self.namespace)
    }

    /// 存档
    ///
    /// 写入前刷新存档时间和版本；`quiet` 为真时不发出 `SAVE_COMPLETE`。
    pub fn save_game(
        &mut self,
        slot: SlotId,
        quiet: bool,
        outbox: &mut Outbox,
    ) -> Result<(), SaveError> {
        self.check_slot(slot)?;
        self.write_slot(slot)?;
        if slot != SlotId::Auto {
            self.active_slot = Some(slot);
        }
        info!(slot = %slot, "存档完成");
        if !quiet {
            outbox.push(Notification::SaveComplete { slot });
        }
        Ok(())
    }

    /// 写入成功后才把时间和版本刷回激活进度
    fn write_slot(&mut self, slot: SlotId) -> Result<(), SaveError> {
        let key = self.key_of(slot);
        let state = self.active.as_ref().ok_or(SaveError::NoActiveState)?;
        let mut record = state.clone();
        record.save_time = now_millis();
        record.schema_version = SCHEMA_VERSION;
        let json = encode_record(&record)?;
        self.store.set(&key, &json)?;

        if let Some(state) = self.active.as_mut() {
            state.save_time = record.save_time;
            state.schema_version = record.schema_version;
        }
        Ok(())
    }

    /// 静默写入 auto 槽位，失败只记日志
    fn write_auto(&mut self) {
        if let Err(e) = self.write_slot(SlotId::Auto) {
            warn!(error = %e, "自动存档失败");
        }
    }

    fn after_mutation(&mut self) {
        if self.auto_save {
            self.write_auto();
        }
    }

    /// 读取并解析槽位，不改变当前进度
    pub fn read_slot(&self, slot: SlotId) -> Result<PlayState, SaveError> {
        self.check_slot(slot)?;
        let key = self.key_of(slot);
        let json = self
            .store
            .get(&key)?
            .ok_or_else(|| SaveError::NotFound { key: key.clone() })?;
        let decoded = decode_record(&key, &json)?;
        if decoded.version_skew {
            warn!(
                slot = %slot,
                saved = decoded.state.schema_version,
                expected = SCHEMA_VERSION,
                "存档版本不一致，继续读取"
            );
        }
        Ok(decoded.state)
    }

    /// 读档
    ///
    /// 成功时替换激活进度并发出 `LOAD_COMPLETE`；
    /// 槽位不存在或损坏时返回 false，当前进度保持不变。
    pub fn load_game(&mut self, slot: SlotId, outbox: &mut Outbox) -> bool {
        match self.read_slot(slot) {
            Ok(state) => {
                info!(slot = %slot, scene = %state.current_scene_id, "读档完成");
                self.active = Some(state);
                self.active_slot = Some(slot);
                outbox.push(Notification::LoadComplete { slot });
                true
            }
            Err(e) => {
                warn!(slot = %slot, error = %e, "读档失败");
                false
            }
        }
    }

    /// 删除存档；删除的是当前会话对应的槽位时同时清空激活进度
    pub fn delete_save(&mut self, slot: SlotId, outbox: &mut Outbox) -> Result<(), SaveError> {
        self.check_slot(slot)?;
        self.store.delete(&self.key_of(slot))?;
        if self.active_slot == Some(slot) {
            info!(slot = %slot, "删除了当前会话的存档，清空进度");
            self.active = None;
            self.active_slot = None;
        }
        outbox.push(Notification::SaveDeleted { slot });
        Ok(())
    }

    /// 槽位是否有存档
    pub fn has_save(&self, slot: SlotId) -> bool {
        self.store
            .get(&self.key_of(slot))
            .map(|v| v.is_some())
            .unwrap_or(false)
    }

    /// 单个槽位的信息（每次从存储现算）
    pub fn slot_info(&self, slot: SlotId) -> SaveSlotInfo {
        let key = self.key_of(slot);
        match self.store.get(&key) {
            Ok(Some(json)) => match decode_record(&key, &json) {
                Ok(decoded) => SaveSlotInfo::from_state(slot, &decoded.state),
                Err(e) => {
                    warn!(slot = %slot, error = %e, "槽位内容损坏");
                    SaveSlotInfo {
                        present: true,
                        ..SaveSlotInfo::empty(slot)
                    }
                }
            },
            Ok(None) => SaveSlotInfo::empty(slot),
            Err(e) => {
                warn!(slot = %slot, error = %e, "读取槽位失败");
                SaveSlotInfo::empty(slot)
            }
        }
    }

    /// auto 槽位加全部手动槽位
    pub fn list_slots(&self) -> Vec<SaveSlotInfo> {
        std::iter::once(SlotId::Auto)
            .chain((1..=self.slot_count).map(SlotId::Numbered))
            .map(|slot| self.slot_info(slot))
            .collect()
    }

    // ── 查询 ──

    pub fn current_scene_id(&self) -> Option<&str> {
        self.active.as_ref().map(|s| s.current_scene_id.as_str())
    }

    pub fn is_in_subscene(&self) -> bool {
        self.active.as_ref().is_some_and(|s| s.is_in_subscene)
    }

    pub fn current_subscene_id(&self) -> Option<&str> {
        self.active
            .as_ref()
            .and_then(|s| s.current_subscene_id.as_deref())
    }

    /// 当前章节（没有进行中的章节时为 None）
    pub fn current_chapter_id(&self) -> Option<&str> {
        self.active
            .as_ref()
            .map(|s| s.current_chapter_id.as_str())
            .filter(|c| !c.is_empty())
    }

    pub fn current_story_node_id(&self) -> Option<&str> {
        self.active
            .as_ref()
            .map(|s| s.current_story_node_id.as_str())
            .filter(|n| !n.is_empty())
    }

    /// 读取 Flag，不存在时返回 `false`
    pub fn get_flag(&self, key: &str) -> FlagValue {
        self.flag_or(key, FlagValue::default())
    }

    /// 读取 Flag，不存在时返回给定默认值
    pub fn flag_or(&self, key: &str, default: FlagValue) -> FlagValue {
        self.active
            .as_ref()
            .and_then(|s| s.story_flags.get(key).copied())
            .unwrap_or(default)
    }

    /// Flag 的真值
    pub fn get_bool(&self, key: &str) -> bool {
        self.get_flag(key).is_truthy()
    }

    /// 物品栏（按获得顺序）
    pub fn get_inventory_list(&self) -> &[String] {
        self.active
            .as_ref()
            .map(|s| s.inventory.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_item(&self, item_id: &str) -> bool {
        self.active.as_ref().is_some_and(|s| s.has_item(item_id))
    }

    pub fn is_item_used(&self, item_id: &str) -> bool {
        self.active
            .as_ref()
            .is_some_and(|s| s.used_items.contains(item_id))
    }

    pub fn is_dialogue_read(&self, dialogue_id: &str) -> bool {
        self.active
            .as_ref()
            .is_some_and(|s| s.read_dialogues.contains(dialogue_id))
    }

    pub fn interactable_state(&self, interactable_id: &str) -> Option<&serde_json::Value> {
        self.active
            .as_ref()
            .and_then(|s| s.interactable_states.get(interactable_id))
    }

    // ── 修改 ──

    /// 写入 Flag（覆盖），返回是否写入
    pub fn set_flag(&mut self, key: &str, value: FlagValue, outbox: &mut Outbox) -> bool {
        let Some(state) = self.active.as_mut() else {
            return false;
        };
        state.story_flags.insert(key.to_string(), value);
        debug!(key, %value, "Flag 更新");
        outbox.push(Notification::FlagChanged {
            key: key.to_string(),
            value,
        });
        self.after_mutation();
        true
    }

    /// 添加物品；已拥有时什么都不做。返回是否新增
    pub fn add_item(&mut self, item_id: &str, outbox: &mut Outbox) -> bool {
        let Some(state) = self.active.as_mut() else {
            return false;
        };
        if state.has_item(item_id) {
            return false;
        }
        state.inventory.push(item_id.to_string());
        outbox.push(Notification::ItemAdded {
            item_id: item_id.to_string(),
        });
        outbox.push(Notification::InventoryUpdate);
        self.after_mutation();
        true
    }

    /// 移除物品；返回是否移除
    pub fn remove_item(&mut self, item_id: &str, outbox: &mut Outbox) -> bool {
        let Some(state) = self.active.as_mut() else {
            return false;
        };
        let Some(index) = state.inventory.iter().position(|i| i == item_id) else {
            return false;
        };
        state.inventory.remove(index);
        outbox.push(Notification::ItemRemoved {
            item_id: item_id.to_string(),
        });
        outbox.push(Notification::InventoryUpdate);
        self.after_mutation();
        true
    }

    /// 标记物品已使用；返回是否首次标记
    pub fn mark_item_used(&mut self, item_id: &str, outbox: &mut Outbox) -> bool {
        let Some(state) = self.active.as_mut() else {
            return false;
        };
        if !state.used_items.insert(item_id.to_string()) {
            return false;
        }
        outbox.push(Notification::ItemUsed {
            item_id: item_id.to_string(),
        });
        self.after_mutation();
        true
    }

    /// 标记对话已读；返回是否首次标记
    pub fn mark_dialogue_read(&mut self, dialogue_id: &str, outbox: &mut Outbox) -> bool {
        let Some(state) = self.active.as_mut() else {
            return false;
        };
        if !state.read_dialogues.insert(dialogue_id.to_string()) {
            return false;
        }
        outbox.push(Notification::DialogueRead {
            dialogue_id: dialogue_id.to_string(),
        });
        self.after_mutation();
        true
    }

    /// 写入交互物状态（内容不透明）
    pub fn set_interactable_state(
        &mut self,
        interactable_id: &str,
        value: serde_json::Value,
        outbox: &mut Outbox,
    ) -> bool {
        let Some(state) = self.active.as_mut() else {
            return false;
        };
        state
            .interactable_states
            .insert(interactable_id.to_string(), value);
        outbox.push(Notification::InteractableStateChanged {
            interactable_id: interactable_id.to_string(),
        });
        self.after_mutation();
        true
    }

    /// 首次访问场景时返回 true，并写入 `VISITED_<scene>`
    pub fn check_first_visit(&mut self, scene_id: &str, outbox: &mut Outbox) -> bool {
        if !self.has_active_state() {
            return false;
        }
        let key = format!("{}{}", VISITED_FLAG_PREFIX, scene_id);
        if self.get_bool(&key) {
            return false;
        }
        self.set_flag(&key, FlagValue::Bool(true), outbox)
    }

    /// 记录当前场景（离开子场景）
    pub fn set_current_scene(&mut self, scene_id: &str) {
        let Some(state) = self.active.as_mut() else {
            return;
        };
        state.current_scene_id = scene_id.to_string();
        state.exit_subscene();
        self.after_mutation();
    }

    /// 记录子场景位置；None 表示回到父场景
    pub fn set_subscene(&mut self, subscene_id: Option<&str>) {
        let Some(state) = self.active.as_mut() else {
            return;
        };
        match subscene_id {
            Some(id) => state.enter_subscene(id),
            None => state.exit_subscene(),
        }
        self.after_mutation();
    }

    /// 记录剧情位置；空串表示没有
    pub fn set_story_position(&mut self, chapter_id: &str, node_id: &str) {
        let Some(state) = self.active.as_mut() else {
            return;
        };
        if state.current_chapter_id == chapter_id && state.current_story_node_id == node_id {
            return;
        }
        state.current_chapter_id = chapter_id.to_string();
        state.current_story_node_id = node_id.to_string();
        self.after_mutation();
    }
}
