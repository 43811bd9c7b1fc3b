//! Maps a channel's speaker bitmask onto the left/right output groups.

/// Speaker position bits, as carried in the host engine's per-channel masks.
pub mod speaker {
    pub const FRONT_LEFT: u32 = 0x1;
    pub const FRONT_RIGHT: u32 = 0x2;
    pub const FRONT_CENTER: u32 = 0x4;
    pub const LOW_FREQUENCY: u32 = 0x8;
    pub const BACK_LEFT: u32 = 0x10;
    pub const BACK_RIGHT: u32 = 0x20;
    pub const FRONT_LEFT_OF_CENTER: u32 = 0x40;
    pub const FRONT_RIGHT_OF_CENTER: u32 = 0x80;
    pub const BACK_CENTER: u32 = 0x100;
    pub const SIDE_LEFT: u32 = 0x200;
    pub const SIDE_RIGHT: u32 = 0x400;
    pub const TOP_CENTER: u32 = 0x800;
    pub const TOP_FRONT_LEFT: u32 = 0x1000;
    pub const TOP_FRONT_CENTER: u32 = 0x2000;
    pub const TOP_FRONT_RIGHT: u32 = 0x4000;
    pub const TOP_BACK_LEFT: u32 = 0x8000;
    pub const TOP_BACK_CENTER: u32 = 0x10000;
    pub const TOP_BACK_RIGHT: u32 = 0x20000;
}

use speaker::*;

/// Center-type speakers feed both output channels.
const CENTER_GROUP: u32 = FRONT_CENTER | BACK_CENTER | TOP_CENTER | TOP_FRONT_CENTER | TOP_BACK_CENTER;

/// Speakers mixed into the left output channel.
pub const LEFT_GROUP: u32 =
    FRONT_LEFT | BACK_LEFT | FRONT_LEFT_OF_CENTER | SIDE_LEFT | TOP_FRONT_LEFT | TOP_BACK_LEFT | CENTER_GROUP;

/// Speakers mixed into the right output channel.
pub const RIGHT_GROUP: u32 =
    FRONT_RIGHT | BACK_RIGHT | FRONT_RIGHT_OF_CENTER | SIDE_RIGHT | TOP_FRONT_RIGHT | TOP_BACK_RIGHT | CENTER_GROUP;

/// Which stereo output channels an input channel contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutputMembership {
    pub left: bool,
    pub right: bool,
}

impl OutputMembership {
    pub fn is_routed(&self) -> bool {
        self.left || self.right
    }
}

/// Classify one channel's speaker mask.
#[inline]
pub fn route(mask: u32) -> OutputMembership {
    OutputMembership {
        left: mask & LEFT_GROUP != 0,
        right: mask & RIGHT_GROUP != 0,
    }
}
