use common::comm::Color;
use std::{fmt, str::FromStr};

/// A named color scheme, defined by fixed color stops between which the
/// palette interpolates linearly.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Scheme {
  /// Dark blue through cyan, yellow and red to dark red.
  #[default]
  Jet,

  /// Black through red and yellow to white.
  Hot,

  /// Black to white.
  Greys,
}

const JET: &[(f64, Color)] = &[
  (0.0, Color::new(0, 0, 131)),
  (0.125, Color::new(0, 60, 170)),
  (0.375, Color::new(5, 255, 255)),
  (0.625, Color::new(255, 255, 0)),
  (0.875, Color::new(250, 0, 0)),
  (1.0, Color::new(128, 0, 0)),
];

const HOT: &[(f64, Color)] = &[
  (0.0, Color::new(0, 0, 0)),
  (0.3, Color::new(230, 0, 0)),
  (0.6, Color::new(255, 210, 0)),
  (1.0, Color::new(255, 255, 255)),
];

const GREYS: &[(f64, Color)] =
  &[(0.0, Color::new(0, 0, 0)), (1.0, Color::new(255, 255, 255))];

impl Scheme {
  /// Returns the color stops of the scheme as `(position, color)` pairs with
  /// positions ascending from 0 to 1.
  fn stops(self) -> &'static [(f64, Color)] {
    match self {
      Self::Jet => JET,
      Self::Hot => HOT,
      Self::Greys => GREYS,
    }
  }

  /// Samples the scheme at `position`, which is clamped to `0..=1`.
  fn sample(self, position: f64) -> Color {
    let stops = self.stops();
    let position = position.clamp(0.0, 1.0);

    let upper = stops
      .iter()
      .position(|(stop, _)| *stop >= position)
      .unwrap_or(stops.len() - 1);

    if upper == 0 {
      return stops[0].1;
    }

    let (from_position, from) = stops[upper - 1];
    let (to_position, to) = stops[upper];
    let t = (position - from_position) / (to_position - from_position);
    let lerp = |a: u8, b: u8| {
      (f64::from(a) + (f64::from(b) - f64::from(a)) * t).round() as u8
    };

    Color::new(lerp(from.r, to.r), lerp(from.g, to.g), lerp(from.b, to.b))
  }
}

impl fmt::Display for Scheme {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Jet => write!(f, "jet"),
      Self::Hot => write!(f, "hot"),
      Self::Greys => write!(f, "greys"),
    }
  }
}

impl FromStr for Scheme {
  type Err = ();

  fn from_str(string: &str) -> Result<Self, Self::Err> {
    match string {
      "jet" => Ok(Self::Jet),
      "hot" => Ok(Self::Hot),
      "greys" => Ok(Self::Greys),
      _ => Err(()),
    }
  }
}

/// A fixed table of `shade_count + 1` colors sampled evenly from a scheme.
///
/// Lookups saturate: values below zero map to the first color and values above
/// `shade_count` map to the last one.
#[derive(Clone, Debug, PartialEq)]
pub struct Palette {
  scheme: Scheme,
  colors: Vec<Color>,
}

impl Palette {
  /// Generates a palette of `shade_count + 1` colors from the given scheme.
  pub fn generate(scheme: Scheme, shade_count: usize) -> Self {
    let colors = (0..=shade_count)
      .map(|index| {
        if shade_count == 0 {
          scheme.sample(0.0)
        } else {
          scheme.sample(index as f64 / shade_count as f64)
        }
      })
      .collect();

    Palette { scheme, colors }
  }

  /// The scheme this palette was sampled from.
  pub fn scheme(&self) -> Scheme {
    self.scheme
  }

  /// The largest valid index into the palette.
  pub fn shade_count(&self) -> usize {
    self.colors.len() - 1
  }

  /// Every color of the palette, in index order.
  pub fn colors(&self) -> &[Color] {
    &self.colors
  }

  /// Rounds `value` to the nearest integer, halves upward, and clamps it into
  /// `0..=shade_count`.
  pub fn index_for(&self, value: f64) -> usize {
    let rounded = (value + 0.5).floor();

    if rounded.is_nan() || rounded <= 0.0 {
      0
    } else {
      (rounded as usize).min(self.shade_count())
    }
  }

  /// The color at the clamped index for `value`.
  pub fn color_for(&self, value: f64) -> Color {
    self.colors[self.index_for(value)]
  }
}
