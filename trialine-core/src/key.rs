use serde::{Deserialize, Serialize};
use std::fmt;

/// Browser key code as reported by the host (`event.keyCode`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyCode(pub u32);

impl KeyCode {
    pub const ENTER: KeyCode = KeyCode(13);
    pub const ESCAPE: KeyCode = KeyCode(27);
    pub const SPACE: KeyCode = KeyCode(32);

    pub fn code(self) -> u32 {
        self.0
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            KeyCode::ENTER => write!(f, "enter"),
            KeyCode::ESCAPE => write!(f, "escape"),
            KeyCode::SPACE => write!(f, "space"),
            KeyCode(code) => write!(f, "key {code}"),
        }
    }
}

impl From<u32> for KeyCode {
    fn from(code: u32) -> Self {
        KeyCode(code)
    }
}
