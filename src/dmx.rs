use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::net::IpAddr;

/// Number of channels in a DMX universe frame.
pub const UNIVERSE_SIZE: usize = 512;

/// Highest universe number that fits the ArtNet port-address (15 bits).
pub const MAX_UNIVERSE: u16 = 0x7fff;

/// Current color state of one entity. `w` is ignored by layouts without a
/// white channel.
#[derive(Debug, Default, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
pub struct ColorSample {
    #[serde(default)]
    pub r: u8,
    #[serde(default)]
    pub g: u8,
    #[serde(default)]
    pub b: u8,
    #[serde(default)]
    pub w: u8,
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
pub enum ColorComponent {
    R,
    G,
    B,
    W,
}

/// Channel layout of the fixtures in a mapping range.
///
/// The set is closed; the router writes frame bytes with a plain match on
/// this tag.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum ChannelLayout {
    Rgb,
    Rgbw,
    Red,
    White,
}

impl ChannelLayout {
    /// Maps an ordered component list from the configuration onto a layout
    /// tag. Sequences outside the supported set are rejected by mapping
    /// validation.
    pub fn from_components(components: &[ColorComponent]) -> Option<ChannelLayout> {
        use ColorComponent::*;

        match components {
            [R, G, B] => Some(ChannelLayout::Rgb),
            [R, G, B, W] => Some(ChannelLayout::Rgbw),
            [R] => Some(ChannelLayout::Red),
            [W] => Some(ChannelLayout::White),
            _ => None,
        }
    }

    pub fn len(&self) -> u16 {
        match self {
            ChannelLayout::Rgb => 3,
            ChannelLayout::Rgbw => 4,
            ChannelLayout::Red | ChannelLayout::White => 1,
        }
    }

    /// Projects `color` onto this layout, writing into `frame` starting at
    /// the 1-based DMX channel `channel_start`. The caller guarantees the
    /// span fits the frame (mapping validation enforces it).
    pub fn write(&self, channel_start: u16, color: &ColorSample, frame: &mut [u8]) {
        let at = (channel_start - 1) as usize;

        match self {
            ChannelLayout::Rgb => {
                frame[at] = color.r;
                frame[at + 1] = color.g;
                frame[at + 2] = color.b;
            }
            ChannelLayout::Rgbw => {
                frame[at] = color.r;
                frame[at + 1] = color.g;
                frame[at + 2] = color.b;
                frame[at + 3] = color.w;
            }
            ChannelLayout::Red => frame[at] = color.r,
            ChannelLayout::White => frame[at] = color.w,
        }
    }
}

impl Display for ChannelLayout {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelLayout::Rgb => write!(f, "RGB"),
            ChannelLayout::Rgbw => write!(f, "RGBW"),
            ChannelLayout::Red => write!(f, "R"),
            ChannelLayout::White => write!(f, "W"),
        }
    }
}

/// Identity of one universe buffer: the controller that receives it and the
/// ArtNet port-address it is sent to.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Copy, Clone, Serialize)]
pub struct UbKey {
    pub controller: IpAddr,
    pub universe: u16,
}

impl Display for UbKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.controller, self.universe)
    }
}

#[cfg(test)]
mod test_layout {
    use super::*;

    #[test]
    fn test_from_components() {
        use ColorComponent::*;

        assert_eq!(ChannelLayout::from_components(&[R, G, B]), Some(ChannelLayout::Rgb));
        assert_eq!(ChannelLayout::from_components(&[R, G, B, W]), Some(ChannelLayout::Rgbw));
        assert_eq!(ChannelLayout::from_components(&[R]), Some(ChannelLayout::Red));
        assert_eq!(ChannelLayout::from_components(&[W]), Some(ChannelLayout::White));

        assert_eq!(ChannelLayout::from_components(&[]), None);
        assert_eq!(ChannelLayout::from_components(&[G, R, B]), None);
        assert_eq!(ChannelLayout::from_components(&[W, R, G, B]), None);
    }

    #[test]
    fn test_write_projection() {
        let color = ColorSample { r: 1, g: 2, b: 3, w: 4 };
        let mut frame = [0u8; UNIVERSE_SIZE];

        ChannelLayout::Rgb.write(1, &color, &mut frame);
        assert_eq!(&frame[0..4], &[1, 2, 3, 0]);

        frame.fill(0);
        ChannelLayout::Rgbw.write(5, &color, &mut frame);
        assert_eq!(&frame[0..4], &[0, 0, 0, 0]);
        assert_eq!(&frame[4..8], &[1, 2, 3, 4]);

        frame.fill(0);
        ChannelLayout::Red.write(512, &color, &mut frame);
        assert_eq!(frame[511], 1);

        frame.fill(0);
        ChannelLayout::White.write(512, &color, &mut frame);
        assert_eq!(frame[511], 4);
    }
}
