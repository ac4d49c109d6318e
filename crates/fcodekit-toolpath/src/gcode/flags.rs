//! Parameter presence flags shared by the parser and every backend

use bitflags::bitflags;

bitflags! {
    /// Which optional parameters a motion command carries.
    ///
    /// The binary writers OR these bits into the motion opcode, so every
    /// value fits below `0x80`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MotionFlags: u8 {
        const HAS_FEEDRATE = 0x40;
        const HAS_X        = 0x20;
        const HAS_Y        = 0x10;
        const HAS_Z        = 0x08;
        const HAS_S        = 0x04;
    }
}

impl MotionFlags {
    /// Flag for an axis letter (`X`, `Y` or `Z`)
    pub fn for_axis(letter: char) -> Option<Self> {
        match letter {
            'X' => Some(Self::HAS_X),
            'Y' => Some(Self::HAS_Y),
            'Z' => Some(Self::HAS_Z),
            _ => None,
        }
    }

    /// Whether any axis bit is set
    pub fn has_axis(self) -> bool {
        self.intersects(Self::HAS_X | Self::HAS_Y | Self::HAS_Z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_lookup() {
        assert_eq!(MotionFlags::for_axis('X'), Some(MotionFlags::HAS_X));
        assert_eq!(MotionFlags::for_axis('Z'), Some(MotionFlags::HAS_Z));
        assert_eq!(MotionFlags::for_axis('E'), None);
    }

    #[test]
    fn test_flags_fit_below_motion_bit() {
        assert_eq!(MotionFlags::all().bits() & 0x80, 0);
        assert!(!MotionFlags::HAS_FEEDRATE.has_axis());
        assert!((MotionFlags::HAS_S | MotionFlags::HAS_Y).has_axis());
    }
}
