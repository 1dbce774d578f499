use crate::ToPrettyString;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, ops::Range, str::FromStr};

/// An opaque 24-bit display color.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Color {
  /// Red channel.
  pub r: u8,

  /// Green channel.
  pub g: u8,

  /// Blue channel.
  pub b: u8,
}

impl Color {
  /// Constructs a color from its three channels.
  pub const fn new(r: u8, g: u8, b: u8) -> Self {
    Color { r, g, b }
  }

  /// Shifts every channel by `alpha * 255`, truncated toward zero, saturating
  /// at both ends. A negative `alpha` darkens the color.
  pub fn brighten(self, alpha: f64) -> Self {
    let shift = (alpha * 255.0) as i32;
    let channel = |value: u8| (i32::from(value) + shift).clamp(0, 255) as u8;

    Color {
      r: channel(self.r),
      g: channel(self.g),
      b: channel(self.b),
    }
  }

  /// Formats the color in CSS functional notation, `rgb(r,g,b)`.
  pub fn to_rgb_string(&self) -> String {
    format!("rgb({},{},{})", self.r, self.g, self.b)
  }
}

impl fmt::Display for Color {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
  }
}

impl FromStr for Color {
  type Err = ();

  /// Parses a `#rrggbb` hex color.
  fn from_str(string: &str) -> Result<Self, Self::Err> {
    let hex = string.strip_prefix('#').ok_or(())?;

    // from_str_radix alone would also accept a sign
    if hex.len() != 6 || !hex.bytes().all(|byte| byte.is_ascii_hexdigit()) {
      return Err(());
    }

    let channel = |range: Range<usize>| {
      u8::from_str_radix(&hex[range], 16).map_err(|_| ())
    };

    Ok(Color {
      r: channel(0..2)?,
      g: channel(2..4)?,
      b: channel(4..6)?,
    })
  }
}

impl ToPrettyString for Color {
  /// Renders a small swatch of the color followed by its hex code.
  fn to_pretty_string(&self) -> String {
    format!("\x1b[48;2;{};{};{}m    \x1b[0m {self}", self.r, self.g, self.b)
  }
}

impl Serialize for Color {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for Color {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let string = String::deserialize(deserializer)?;

    string
      .parse()
      .map_err(|_| de::Error::custom(format!("invalid hex color '{string}'")))
  }
}

/// Where the highlight of every point marker sits, relative to the marker.
const RADIAL_GRADIENT: RadialGradient = RadialGradient {
  cx: 0.4,
  cy: 0.3,
  r: 0.5,
};

/// One colorized point appended to the live chart series.
///
/// The marker is drawn as a radial gradient from `color_start` at its center
/// to `color_end` at its edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeedPoint {
  /// Position along the X axis.
  pub x: f64,

  /// Position along the Y axis.
  pub y: f64,

  /// Receive power, in whole dBm.
  pub z: i32,

  /// Color at the center of the marker.
  pub color_start: Color,

  /// Color at the edge of the marker.
  pub color_end: Color,
}

#[derive(Clone, Copy, Debug, Serialize)]
struct RadialGradient {
  cx: f64,
  cy: f64,
  r: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Marker {
  radial_gradient: RadialGradient,
  stops: [(u8, String); 2],
}

#[derive(Debug, Serialize)]
struct ChartPoint {
  x: f64,
  y: f64,
  z: i32,
  color: Marker,
}

impl Serialize for FeedPoint {
  /// Serializes into the shape a 3D scatter chart expects for a single point,
  /// `{x, y, z, color: {radialGradient, stops}}`.
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    ChartPoint {
      x: self.x,
      y: self.y,
      z: self.z,
      color: Marker {
        radial_gradient: RADIAL_GRADIENT,
        stops: [
          (0, self.color_start.to_string()),
          (1, self.color_end.to_rgb_string()),
        ],
      },
    }
    .serialize(serializer)
  }
}
