//! # Interaction 模块
//!
//! 交互路由：把不透明的交互物 id 映射到场景配置中声明的动作。
//!
//! 路由只负责解析（输入检查、按当前场景 / 子场景查找、取第一个匹配），
//! 解析出的 [`InteractionAction`] 由 `GameCore` 分发给对应组件。
//! 显示 / 隐藏用的注册表与分发路径互相独立。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::catalog::{InteractableConfig, InteractionAction};
use crate::notification::Notification;
use crate::services::Services;

/// 表现层节点的不透明句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewHandle(pub u64);

/// 已注册的交互物
#[derive(Debug, Clone, PartialEq)]
struct Registration {
    kind: String,
    handle: ViewHandle,
}

/// 交互路由
#[derive(Debug, Default)]
pub struct InteractionRouter {
    registry: HashMap<String, Registration>,
}

/// 当前所在位置下可点击的交互物配置
pub fn find_interactable<'c>(sv: &'c Services, interactable_id: &str) -> Option<&'c InteractableConfig> {
    let scene_id = sv.save.current_scene_id()?;
    let scene = sv.catalog.scene(scene_id)?;
    let subscene = if sv.save.is_in_subscene() {
        // 子场景中只看子场景自己的列表
        Some(sv.save.current_subscene_id().unwrap_or_default())
    } else {
        None
    };
    scene.interactable(subscene, interactable_id)
}

impl InteractionRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 解析一次点击
    ///
    /// 输入不被允许、没有场景配置、没有匹配项时都静默返回 None。
    pub fn handle_click(&self, interactable_id: &str, sv: &Services) -> Option<InteractionAction> {
        if !sv.is_input_allowed() {
            debug!(interactable_id, mode = ?sv.mode(), "当前模式不接受点击");
            return None;
        }
        let config = find_interactable(sv, interactable_id);
        if config.is_none() {
            debug!(interactable_id, "没有匹配的交互物配置");
        }
        config.map(|c| c.action.clone())
    }

    /// 注册交互物的表现层节点
    pub fn register_interactable(
        &mut self,
        interactable_id: impl Into<String>,
        kind: impl Into<String>,
        handle: ViewHandle,
    ) {
        self.registry.insert(
            interactable_id.into(),
            Registration {
                kind: kind.into(),
                handle,
            },
        );
    }

    pub fn unregister_interactable(&mut self, interactable_id: &str) {
        self.registry.remove(interactable_id);
    }

    pub fn registered_kind(&self, interactable_id: &str) -> Option<&str> {
        self.registry.get(interactable_id).map(|r| r.kind.as_str())
    }

    /// 显示交互物；未注册的 id 被忽略
    pub fn show(&self, interactable_id: &str, sv: &mut Services) {
        self.set_visible(interactable_id, true, sv);
    }

    /// 隐藏交互物；未注册的 id 被忽略
    pub fn hide(&self, interactable_id: &str, sv: &mut Services) {
        self.set_visible(interactable_id, false, sv);
    }

    fn set_visible(&self, interactable_id: &str, visible: bool, sv: &mut Services) {
        let Some(registration) = self.registry.get(interactable_id) else {
            debug!(interactable_id, "交互物未注册");
            return;
        };
        sv.emit(Notification::InteractableVisibility {
            interactable_id: interactable_id.to_string(),
            handle: registration.handle,
            visible,
        });
    }

    /// 清空注册表（回到主菜单时调用）
    pub fn clear(&mut self) {
        self.registry.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::GameMode;
    use crate::test_support::services_with;

    const CATALOG: &str = r#"{
        "new_game": { "start_scene": "bedroom" },
        "items": [ { "id": "note" } ],
        "scenes": [ {
            "id": "bedroom",
            "interactables": [
                { "id": "desk", "type": "subscene", "subscene": "desk_close" },
                { "id": "poster", "type": "animation", "animation": "flutter" },
                { "id": "poster", "type": "custom", "name": "never" }
            ],
            "subscenes": [ {
                "id": "desk_close",
                "interactables": [ { "id": "note", "type": "pick_item", "item": "note" } ]
            } ]
        } ]
    }"#;

    #[test]
    fn test_click_declined_when_input_disallowed() {
        let mut sv = services_with(CATALOG);
        sv.save.start_new_game("bedroom");
        let router = InteractionRouter::new();

        sv.set_mode(GameMode::Menu);
        assert_eq!(router.handle_click("poster", &sv), None);

        sv.set_mode(GameMode::Gameplay);
        assert_eq!(
            router.handle_click("poster", &sv),
            Some(InteractionAction::Animation {
                animation: "flutter".to_string()
            })
        );
    }

    #[test]
    fn test_subscene_list_substitutes_scene_list() {
        let mut sv = services_with(CATALOG);
        sv.save.start_new_game("bedroom");
        sv.set_mode(GameMode::Gameplay);
        let router = InteractionRouter::new();

        assert_eq!(router.handle_click("note", &sv), None);
        sv.save.set_subscene(Some("desk_close"));
        assert!(matches!(
            router.handle_click("note", &sv),
            Some(InteractionAction::PickItem { .. })
        ));
        assert_eq!(router.handle_click("desk", &sv), None);
    }

    #[test]
    fn test_no_state_is_silent() {
        let mut sv = services_with(CATALOG);
        sv.set_mode(GameMode::Gameplay);
        assert_eq!(InteractionRouter::new().handle_click("desk", &sv), None);
    }

    #[test]
    fn test_show_hide_registered_only() {
        let mut sv = services_with(CATALOG);
        let mut router = InteractionRouter::new();
        router.register_interactable("lamp", "toggle", ViewHandle(4));
        assert_eq!(router.registered_kind("lamp"), Some("toggle"));

        router.hide("lamp", &mut sv);
        router.show("ghost", &mut sv);
        assert_eq!(
            sv.outbox.drain(),
            vec![Notification::InteractableVisibility {
                interactable_id: "lamp".to_string(),
                handle: ViewHandle(4),
                visible: false,
            }]
        );
    }
}
