use engine::{EntityId, Vec2};

use super::world_object::WorldObject;

pub(crate) const CONTENT_LIFE: &str = "life";
pub(crate) const CONTENT_KEY: &str = "key";
pub(crate) const CONTENT_RUBY: &str = "ruby";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BoxAnim {
    Closed,
    OpenWithContent(String),
    OpenEmpty,
}

impl BoxAnim {
    pub(crate) fn animation_key(&self) -> String {
        match self {
            Self::Closed => "box-closed".to_string(),
            Self::OpenWithContent(content) => format!("box-open-{content}"),
            Self::OpenEmpty => "box-open-empty".to_string(),
        }
    }
}

/// One-shot container placed from level data.
#[derive(Debug, Clone)]
pub(crate) struct LootBox {
    pub(crate) object: WorldObject,
    content: String,
    collectable: bool,
    anim: BoxAnim,
}

impl LootBox {
    pub(crate) fn new(id: EntityId, position: Vec2, content: impl Into<String>) -> Self {
        let anim = BoxAnim::Closed;
        Self {
            object: WorldObject::new(id, position, &anim.animation_key()),
            content: content.into(),
            collectable: true,
            anim,
        }
    }

    /// Hands out the content on the first call only.
    pub(crate) fn open(&mut self) -> Option<String> {
        let content = match self.anim {
            BoxAnim::Closed => {
                self.anim = BoxAnim::OpenWithContent(self.content.clone());
                Some(self.content.clone())
            }
            BoxAnim::OpenWithContent(_) | BoxAnim::OpenEmpty => {
                self.anim = BoxAnim::OpenEmpty;
                self.collectable = false;
                None
            }
        };
        self.object.play(&self.anim.animation_key());
        content
    }

    pub(crate) fn content(&self) -> &str {
        &self.content
    }

    pub(crate) fn is_collectable(&self) -> bool {
        self.collectable
    }

    pub(crate) fn anim(&self) -> &BoxAnim {
        &self.anim
    }
}
