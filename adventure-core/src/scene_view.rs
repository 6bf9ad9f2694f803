//! # SceneView 模块
//!
//! 场景视图控制器：管理可见场景、预加载缓冲、子场景和转场时序。
//!
//! ## 槽位
//!
//! - `visible`：当前可见的场景内容
//! - `staging`：预加载的下一个场景（同一时刻最多一个）
//! - 转场遮罩标记：转场进行中为真
//!
//! 切换场景时交换槽位中的句柄，不移动任何表现层节点。
//!
//! ## 切换时序
//!
//! ```text
//! switch_to_scene ──▶ 预加载到 staging ──▶ TRANSITION_OUT
//!                                            │
//!          (转出完成 且 内容就绪，顺序任意) ◀─┘
//!                        │
//!                        ▼
//!          交换槽位 ──▶ TRANSITION_IN ──▶ 转入完成 ──▶ SCENE_SWITCH_COMPLETE ──▶ 预加载 preload_next
//! ```
//!
//! 转场进行中（或冷加载进行中）收到的切换请求直接丢弃。

use std::collections::HashMap;
use tracing::{debug, error, info, warn};

use crate::error::{ContentError, LoadError};
use crate::notification::Notification;
use crate::resources::{AssetHandle, AssetKey, LoadRequest, LoadTicket, Resolution};
use crate::services::Services;

/// 控制器阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScenePhase {
    #[default]
    Idle,
    /// 冷加载进行中
    Loading,
    /// 转场进行中
    Transitioning,
}

/// 场景变为可见
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneEvent {
    /// 冷加载完成
    Loaded(String),
    /// 带转场的切换完成
    Switched(String),
}

impl SceneEvent {
    pub fn scene_id(&self) -> &str {
        match self {
            Self::Loaded(id) | Self::Switched(id) => id,
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    scene_id: String,
    key: AssetKey,
    handle: AssetHandle,
}

#[derive(Debug, Clone)]
struct Staged {
    scene_id: String,
    key: AssetKey,
    /// None 表示还在拉取
    handle: Option<AssetHandle>,
}

#[derive(Debug, Clone)]
struct SubsceneSlot {
    subscene_id: String,
    key: AssetKey,
    handle: Option<AssetHandle>,
}

#[derive(Debug, Clone)]
struct PendingSwitch {
    target: String,
    out_done: bool,
    swapped: bool,
}

/// 在途凭据的用途
#[derive(Debug, Clone, PartialEq, Eq)]
enum Purpose {
    Cold(String),
    Stage(String),
    Subscene(String),
    Warm,
    /// 已被取代，到达后直接释放
    Discard,
}

/// 场景视图控制器
#[derive(Debug, Default)]
pub struct SceneView {
    phase: ScenePhase,
    visible: Option<Slot>,
    staging: Option<Staged>,
    subscene: Option<SubsceneSlot>,
    transition_overlay: bool,
    switch: Option<PendingSwitch>,
    tickets: HashMap<LoadTicket, Purpose>,
    /// 预热进缓存、由本控制器持有引用的资源
    warm: Vec<AssetKey>,
    /// 冷加载完成后要重新进入的子场景
    restore_subscene: Option<String>,
}

impl SceneView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> ScenePhase {
        self.phase
    }

    /// 当前可见的场景
    pub fn current_scene(&self) -> Option<&str> {
        self.visible.as_ref().map(|s| s.scene_id.as_str())
    }

    pub fn visible_handle(&self) -> Option<AssetHandle> {
        self.visible.as_ref().map(|s| s.handle)
    }

    /// 预加载槽位中的场景（可能还在拉取）
    pub fn staged_scene(&self) -> Option<&str> {
        self.staging.as_ref().map(|s| s.scene_id.as_str())
    }

    pub fn current_subscene(&self) -> Option<&str> {
        self.subscene.as_ref().map(|s| s.subscene_id.as_str())
    }

    pub fn is_in_subscene(&self) -> bool {
        self.subscene.is_some()
    }

    pub fn is_transition_overlay_active(&self) -> bool {
        self.transition_overlay
    }

    /// 该凭据是否由本控制器发起
    pub fn owns(&self, ticket: LoadTicket) -> bool {
        self.tickets.contains_key(&ticket)
    }

    // ── 冷加载 ──

    /// 冷加载场景（新游戏 / 读档路径）
    ///
    /// 取代一切进行中的切换、预加载和更早的冷加载。
    pub fn load_scene(
        &mut self,
        scene_id: &str,
        sv: &mut Services,
    ) -> Result<Option<SceneEvent>, ContentError> {
        self.load_scene_restoring(scene_id, None, sv)
    }

    /// 冷加载场景，完成后重新进入 `subscene`
    pub fn load_scene_restoring(
        &mut self,
        scene_id: &str,
        subscene: Option<String>,
        sv: &mut Services,
    ) -> Result<Option<SceneEvent>, ContentError> {
        let key = sv
            .catalog
            .require_scene(scene_id)
            .map(|s| AssetKey::scene(s.content_id()))
            .inspect_err(|e| error!(error = %e, "无法载入场景"))?;

        self.discard_pending();
        self.discard_staging(sv);
        self.close_subscene(sv, false);
        self.release_warm(sv);
        self.switch = None;
        self.transition_overlay = false;
        self.restore_subscene = subscene;
        self.phase = ScenePhase::Loading;
        info!(scene_id, "冷加载场景");

        match sv.loader.load(key.clone()) {
            LoadRequest::Ready(handle) => Ok(Some(self.finish_cold(scene_id, key, handle, sv))),
            LoadRequest::Pending(ticket) => {
                self.tickets
                    .insert(ticket, Purpose::Cold(scene_id.to_string()));
                Ok(None)
            }
        }
    }

    fn finish_cold(
        &mut self,
        scene_id: &str,
        key: AssetKey,
        handle: AssetHandle,
        sv: &mut Services,
    ) -> SceneEvent {
        self.present(scene_id, key, handle, sv);
        self.phase = ScenePhase::Idle;
        sv.emit(Notification::SceneLoadComplete {
            scene_id: scene_id.to_string(),
        });

        if let Some(subscene_id) = self.restore_subscene.take()
            && let Err(e) = self.enter_subscene(&subscene_id, sv)
        {
            warn!(error = %e, "无法恢复子场景");
        }
        self.start_preloads(scene_id, sv);
        SceneEvent::Loaded(scene_id.to_string())
    }

    /// 替换可见槽位，释放旧内容
    fn present(&mut self, scene_id: &str, key: AssetKey, handle: AssetHandle, sv: &mut Services) {
        let previous = self.visible.replace(Slot {
            scene_id: scene_id.to_string(),
            key,
            handle,
        });
        if let Some(previous) = previous {
            sv.loader.release(&previous.key);
        }
        sv.save.set_current_scene(scene_id);
        sv.emit(Notification::PresentScene {
            scene_id: scene_id.to_string(),
            handle,
        });
    }

    // ── 带转场的切换 ──

    /// 切换场景，返回请求是否被接受
    ///
    /// 转场进行中、冷加载进行中、目标就是当前场景时请求被丢弃。
    pub fn switch_to_scene(&mut self, scene_id: &str, sv: &mut Services) -> bool {
        if self.phase != ScenePhase::Idle {
            debug!(scene_id, phase = ?self.phase, "切换请求被丢弃");
            return false;
        }
        let key = match sv.catalog.require_scene(scene_id) {
            Ok(scene) => AssetKey::scene(scene.content_id()),
            Err(e) => {
                error!(error = %e, "无法切换场景");
                return false;
            }
        };
        if self.current_scene() == Some(scene_id) {
            debug!(scene_id, "已经在目标场景");
            return false;
        }

        if self.subscene.is_some() {
            self.exit_subscene(sv);
        }

        let already_staged = self
            .staging
            .as_ref()
            .is_some_and(|s| s.scene_id == scene_id);
        if !already_staged {
            // 预加载的是别的场景：丢弃
            self.discard_staging(sv);
            self.stage(scene_id, key, sv);
        }

        self.phase = ScenePhase::Transitioning;
        self.transition_overlay = true;
        self.switch = Some(PendingSwitch {
            target: scene_id.to_string(),
            out_done: false,
            swapped: false,
        });
        info!(scene_id, "开始切换场景");
        sv.emit(Notification::SceneSwitchStart {
            scene_id: scene_id.to_string(),
        });
        sv.emit(Notification::TransitionOut {
            scene_id: scene_id.to_string(),
        });
        true
    }

    /// 表现层报告转出动画完成
    pub fn transition_out_done(&mut self, sv: &mut Services) {
        match self.switch.as_mut() {
            Some(switch) if !switch.out_done => switch.out_done = true,
            _ => {
                debug!("没有等待转出的切换");
                return;
            }
        }
        self.try_swap(sv);
    }

    /// 表现层报告转入动画完成
    pub fn transition_in_done(&mut self, sv: &mut Services) -> Option<SceneEvent> {
        if !self.switch.as_ref().is_some_and(|s| s.swapped) {
            debug!("没有等待转入的切换");
            return None;
        }
        let switch = self.switch.take()?;
        self.phase = ScenePhase::Idle;
        self.transition_overlay = false;
        self.release_warm(sv);
        info!(scene_id = %switch.target, "场景切换完成");
        sv.emit(Notification::SceneSwitchComplete {
            scene_id: switch.target.clone(),
        });
        self.start_preloads(&switch.target, sv);
        Some(SceneEvent::Switched(switch.target))
    }

    /// 转出已完成且内容就绪时交换槽位
    fn try_swap(&mut self, sv: &mut Services) {
        let Some(switch) = self.switch.as_mut() else {
            return;
        };
        if !switch.out_done || switch.swapped {
            return;
        }
        let ready = self
            .staging
            .as_ref()
            .is_some_and(|s| s.scene_id == switch.target && s.handle.is_some());
        if !ready {
            return;
        }
        let Some(Staged {
            scene_id,
            key,
            handle: Some(handle),
        }) = self.staging.take()
        else {
            return;
        };
        switch.swapped = true;

        self.present(&scene_id, key, handle, sv);
        sv.emit(Notification::TransitionIn { scene_id });
    }

    // ── 子场景 ──

    /// 进入当前场景的子场景；不改变当前场景，也不改变模式
    pub fn enter_subscene(&mut self, subscene_id: &str, sv: &mut Services) -> Result<bool, ContentError> {
        let Some(scene_id) = self.current_scene().map(str::to_string) else {
            warn!(subscene_id, "没有可见场景，无法进入子场景");
            return Ok(false);
        };
        if self.phase != ScenePhase::Idle {
            debug!(subscene_id, "转场中，忽略子场景请求");
            return Ok(false);
        }
        if self.current_subscene() == Some(subscene_id) {
            return Ok(false);
        }
        let key = sv
            .catalog
            .require_scene(&scene_id)?
            .subscene(subscene_id)
            .map(|s| AssetKey::scene(s.content_id()))
            .ok_or_else(|| ContentError::SubsceneMissing {
                scene_id: scene_id.clone(),
                subscene_id: subscene_id.to_string(),
            })
            .inspect_err(|e| error!(error = %e, "无法进入子场景"))?;

        if self.subscene.is_some() {
            self.exit_subscene(sv);
        }

        sv.save.set_subscene(Some(subscene_id));
        info!(subscene_id, "进入子场景");
        sv.emit(Notification::SubsceneEnter {
            subscene_id: subscene_id.to_string(),
        });

        let handle = match sv.loader.load(key.clone()) {
            LoadRequest::Ready(handle) => Some(handle),
            LoadRequest::Pending(ticket) => {
                self.tickets
                    .insert(ticket, Purpose::Subscene(subscene_id.to_string()));
                None
            }
        };
        self.subscene = Some(SubsceneSlot {
            subscene_id: subscene_id.to_string(),
            key,
            handle,
        });
        if let Some(handle) = handle {
            sv.emit(Notification::PresentSubscene {
                subscene_id: subscene_id.to_string(),
                handle,
            });
        }
        Ok(true)
    }

    /// 退出子场景；不在子场景中时返回 false
    pub fn exit_subscene(&mut self, sv: &mut Services) -> bool {
        self.close_subscene(sv, true)
    }

    fn close_subscene(&mut self, sv: &mut Services, persist: bool) -> bool {
        let Some(slot) = self.subscene.take() else {
            return false;
        };
        match slot.handle {
            Some(_) => sv.loader.release(&slot.key),
            None => self.discard_where(|p| matches!(p, Purpose::Subscene(_))),
        }
        if persist {
            sv.save.set_subscene(None);
        }
        info!(subscene_id = %slot.subscene_id, "退出子场景");
        sv.emit(Notification::SubsceneExit {
            subscene_id: slot.subscene_id,
        });
        true
    }

    // ── 预加载 ──

    fn stage(&mut self, scene_id: &str, key: AssetKey, sv: &mut Services) {
        let handle = match sv.loader.load(key.clone()) {
            LoadRequest::Ready(handle) => Some(handle),
            LoadRequest::Pending(ticket) => {
                self.tickets
                    .insert(ticket, Purpose::Stage(scene_id.to_string()));
                None
            }
        };
        debug!(scene_id, ready = handle.is_some(), "预加载到 staging");
        self.staging = Some(Staged {
            scene_id: scene_id.to_string(),
            key,
            handle,
        });
    }

    fn discard_staging(&mut self, sv: &mut Services) {
        let Some(staged) = self.staging.take() else {
            return;
        };
        debug!(scene_id = %staged.scene_id, "丢弃过期的预加载");
        match staged.handle {
            Some(_) => sv.loader.release(&staged.key),
            None => self.discard_where(|p| matches!(p, Purpose::Stage(_))),
        }
    }

    /// 第一个 `preload_next` 进 staging，其余预热进缓存
    fn start_preloads(&mut self, scene_id: &str, sv: &mut Services) {
        let Some(scene) = sv.catalog.scene(scene_id) else {
            return;
        };
        let targets: Vec<(String, AssetKey)> = scene
            .preload_next
            .iter()
            .filter(|id| id.as_str() != scene_id)
            .filter_map(|id| match sv.catalog.scene(id) {
                Some(next) => Some((id.clone(), AssetKey::scene(next.content_id()))),
                None => {
                    warn!(scene_id, preload = %id, "预加载目标不存在");
                    None
                }
            })
            .collect();

        let mut targets = targets.into_iter();
        if let Some((next_id, key)) = targets.next()
            && self.staging.is_none()
        {
            self.stage(&next_id, key, sv);
        }
        for (_, key) in targets {
            match sv.loader.load(key.clone()) {
                LoadRequest::Ready(_) => self.warm.push(key),
                LoadRequest::Pending(ticket) => {
                    self.tickets.insert(ticket, Purpose::Warm);
                }
            }
        }
    }

    fn release_warm(&mut self, sv: &mut Services) {
        for key in self.warm.drain(..) {
            sv.loader.release(&key);
        }
        self.discard_where(|p| *p == Purpose::Warm);
    }

    fn discard_where(&mut self, predicate: impl Fn(&Purpose) -> bool) {
        for purpose in self.tickets.values_mut() {
            if predicate(purpose) {
                *purpose = Purpose::Discard;
            }
        }
    }

    fn discard_pending(&mut self) {
        self.discard_where(|_| true);
    }

    // ── 资源回传 ──

    /// 处理本控制器发起的加载结果
    pub fn on_asset_loaded(&mut self, resolution: &Resolution, sv: &mut Services) -> Option<SceneEvent> {
        let purpose = self.tickets.remove(&resolution.ticket)?;
        let key = &resolution.key;

        let handle = match &resolution.result {
            Ok(handle) => *handle,
            Err(e) => {
                if purpose != Purpose::Discard {
                    self.on_load_failed(purpose, e, sv);
                }
                return None;
            }
        };

        match purpose {
            Purpose::Discard => {
                debug!(asset = %key, "过期的加载结果，释放");
                sv.loader.release(key);
                None
            }
            Purpose::Cold(scene_id) => Some(self.finish_cold(&scene_id, key.clone(), handle, sv)),
            Purpose::Stage(scene_id) => {
                match self.staging.as_mut() {
                    Some(staged) if staged.scene_id == scene_id && staged.handle.is_none() => {
                        staged.handle = Some(handle);
                    }
                    _ => {
                        sv.loader.release(key);
                        return None;
                    }
                }
                self.try_swap(sv);
                None
            }
            Purpose::Subscene(subscene_id) => {
                match self.subscene.as_mut() {
                    Some(slot) if slot.subscene_id == subscene_id && slot.handle.is_none() => {
                        slot.handle = Some(handle);
                        sv.emit(Notification::PresentSubscene {
                            subscene_id,
                            handle,
                        });
                    }
                    _ => sv.loader.release(key),
                }
                None
            }
            Purpose::Warm => {
                self.warm.push(key.clone());
                None
            }
        }
    }

    fn on_load_failed(&mut self, purpose: Purpose, error: &LoadError, sv: &mut Services) {
        let LoadError::FetchFailed { asset, cause } = error;
        warn!(asset = %asset, cause = %cause, purpose = ?purpose, "场景资源加载失败");
        sv.emit(Notification::LoadFailed {
            asset: asset.clone(),
            cause: cause.clone(),
        });

        match purpose {
            Purpose::Cold(_) => {
                self.phase = ScenePhase::Idle;
                self.restore_subscene = None;
            }
            Purpose::Stage(scene_id) => {
                if self.staging.as_ref().is_some_and(|s| s.scene_id == scene_id) {
                    self.staging = None;
                }
                let cancelled = self
                    .switch
                    .as_ref()
                    .is_some_and(|s| s.target == scene_id && !s.swapped);
                if cancelled {
                    // 取消切换，保留原来的可见内容
                    self.switch = None;
                    self.phase = ScenePhase::Idle;
                    self.transition_overlay = false;
                    if let Some(current) = self.current_scene().map(str::to_string) {
                        sv.emit(Notification::TransitionIn { scene_id: current });
                    }
                }
            }
            Purpose::Subscene(subscene_id) => {
                if self.current_subscene() == Some(subscene_id.as_str()) {
                    self.exit_subscene(sv);
                }
            }
            Purpose::Warm | Purpose::Discard => {}
        }
    }

    /// 释放所有持有的内容并回到空闲（回到主菜单时调用），不发出通知
    pub fn reset(&mut self, sv: &mut Services) {
        self.discard_pending();
        if let Some(slot) = self.visible.take() {
            sv.loader.release(&slot.key);
        }
        if let Some(Staged {
            key,
            handle: Some(_),
            ..
        }) = self.staging.take()
        {
            sv.loader.release(&key);
        }
        if let Some(SubsceneSlot {
            key,
            handle: Some(_),
            ..
        }) = self.subscene.take()
        {
            sv.loader.release(&key);
        }
        for key in self.warm.drain(..) {
            sv.loader.release(&key);
        }
        self.switch = None;
        self.transition_overlay = false;
        self.restore_subscene = None;
        self.phase = ScenePhase::Idle;
    }
}
