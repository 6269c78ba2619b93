#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Quit,
}

impl InputAction {
    const fn bit(self) -> u8 {
        match self {
            InputAction::MoveUp => 1 << 0,
            InputAction::MoveDown => 1 << 1,
            InputAction::MoveLeft => 1 << 2,
            InputAction::MoveRight => 1 << 3,
            InputAction::Quit => 1 << 4,
        }
    }
}

/// Held state of every action, packed one bit per action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ActionStates {
    held: u8,
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        if is_down {
            self.held |= action.bit();
        } else {
            self.held &= !action.bit();
        }
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.held & action.bit() != 0
    }
}

/// Turns a stream of press/release notifications into a single-tick press edge.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct EdgeLatch {
    is_down: bool,
    pressed_edge: bool,
}

impl EdgeLatch {
    pub(crate) fn update(&mut self, pressed: bool) {
        if pressed && !self.is_down {
            self.pressed_edge = true;
        }
        self.is_down = pressed;
    }

    pub(crate) fn take(&mut self) -> bool {
        std::mem::take(&mut self.pressed_edge)
    }
}
