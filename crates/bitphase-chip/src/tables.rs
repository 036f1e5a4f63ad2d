//! Amplitude tables and envelope shape definitions.

/// Measured AY-3-8910 output levels, indexed by 5-bit level.
///
/// The AY has 16 amplitude steps, so neighbouring entries are paired.
pub const AY_LEVELS: [f32; 32] = [
    0.0, 0.0, 0.009_994_659, 0.009_994_659, 0.014_450_294, 0.014_450_294, 0.021_057_45,
    0.021_057_45, 0.030_701_152, 0.030_701_152, 0.045_548_18, 0.045_548_18, 0.064_499_886,
    0.064_499_886, 0.107_362_48, 0.107_362_48, 0.126_588_85, 0.126_588_85, 0.204_989_7,
    0.204_989_7, 0.292_210_27, 0.292_210_27, 0.372_838_94, 0.372_838_94, 0.492_530_7,
    0.492_530_7, 0.635_324_6, 0.635_324_6, 0.805_584_8, 0.805_584_8, 1.0, 1.0,
];

/// Measured YM2149 output levels, indexed by 5-bit level.
pub const YM_LEVELS: [f32; 32] = [
    0.0, 0.0, 0.004_654_002, 0.007_721_065, 0.010_955_978, 0.013_962_005, 0.016_998_55,
    0.020_019_837, 0.024_368_658, 0.029_694_057, 0.035_065_232, 0.040_390_63, 0.048_538_95,
    0.058_335_24, 0.068_055_24, 0.077_775_234, 0.092_515_45, 0.111_085_68, 0.129_747_46,
    0.148_485_54, 0.176_668_96, 0.211_551_08, 0.246_387_43, 0.281_101_7, 0.333_730_07,
    0.400_427_25, 0.467_383_84, 0.534_431_97, 0.635_172_05, 0.758_007_2, 0.879_926_74, 1.0,
];

/// One half of an envelope shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeSegment {
    /// Level rises from 0 to 31.
    SlideUp,
    /// Level falls from 31 to 0.
    SlideDown,
    /// Level stays at 31.
    HoldTop,
    /// Level stays at 0.
    HoldBottom,
}

impl EnvelopeSegment {
    /// Level the segment starts at.
    pub fn start_level(self) -> i32 {
        match self {
            EnvelopeSegment::SlideDown | EnvelopeSegment::HoldTop => 31,
            EnvelopeSegment::SlideUp | EnvelopeSegment::HoldBottom => 0,
        }
    }
}

use self::EnvelopeSegment::{HoldBottom, HoldTop, SlideDown, SlideUp};

/// Segment pairs for the 16 shape register values.
///
/// The envelope plays the first segment once, then alternates between the
/// two; hold segments therefore latch forever.
pub const ENVELOPE_SHAPES: [[EnvelopeSegment; 2]; 16] = [
    [SlideDown, HoldBottom],
    [SlideDown, HoldBottom],
    [SlideDown, HoldBottom],
    [SlideDown, HoldBottom],
    [SlideUp, HoldBottom],
    [SlideUp, HoldBottom],
    [SlideUp, HoldBottom],
    [SlideUp, HoldBottom],
    [SlideDown, SlideDown],
    [SlideDown, HoldBottom],
    [SlideDown, SlideUp],
    [SlideDown, HoldTop],
    [SlideUp, SlideUp],
    [SlideUp, HoldTop],
    [SlideUp, SlideDown],
    [SlideUp, HoldBottom],
];
