//! Stellar model and per-system summary info.
//!
//! Main-sequence relations in solar units:
//!
//! ```text
//! L = M^3.5        R = M^0.8        T = 5778 K * (L / R^2)^0.25
//! lifetime = 10 Gyr * M^-2.5
//! ```
//!
//! A star older than its main-sequence lifetime is a white dwarf.

use rand::Rng;

use super::seed::{choose_weighted, sample_log_range, sample_range};

/// Surface temperature of the Sun in kelvin.
const SOLAR_TEMPERATURE: f64 = 5778.0;

/// Number of stars in a system and its relative frequency.
const MULTIPLICITY_WEIGHTS: [(usize, f64); 4] = [(1, 0.55), (2, 0.33), (3, 0.09), (4, 0.03)];

/// Fraction of the stellar mass left over as planet-forming material.
const DISC_FRACTION_MIN: f64 = 0.0005;
const DISC_FRACTION_MAX: f64 = 0.01;

const SYLLABLES: [&str; 24] = [
  "ka", "ri", "ven", "sol", "ta", "mir", "ul", "dra", "ne", "xo", "ly", "ar", "os", "qui", "zen",
  "be", "tor", "al", "ith", "cor", "ea", "myr", "ga", "phi",
];

/// Harvard spectral class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StellarClass {
  O,
  B,
  A,
  F,
  G,
  K,
  M,
  WhiteDwarf,
}

impl StellarClass {
  /// Main-sequence class for an effective temperature in kelvin.
  pub fn from_temperature(temperature: f64) -> Self {
    match temperature {
      t if t >= 30_000.0 => Self::O,
      t if t >= 10_000.0 => Self::B,
      t if t >= 7_500.0 => Self::A,
      t if t >= 6_000.0 => Self::F,
      t if t >= 5_200.0 => Self::G,
      t if t >= 3_700.0 => Self::K,
      _ => Self::M,
    }
  }

  pub fn letter(self) -> &'static str {
    match self {
      Self::O => "O",
      Self::B => "B",
      Self::A => "A",
      Self::F => "F",
      Self::G => "G",
      Self::K => "K",
      Self::M => "M",
      Self::WhiteDwarf => "D",
    }
  }
}

/// One star. Mass, luminosity and radius in solar units, temperature in K.
#[derive(Clone, Debug, PartialEq)]
pub struct Star {
  pub mass: f64,
  pub luminosity: f64,
  pub radius: f64,
  pub temperature: f64,
  pub class: StellarClass,
}

impl Star {
  /// Main-sequence lifetime in billions of years.
  pub fn lifetime(mass: f64) -> f64 {
    10.0 * mass.powf(-2.5)
  }

  /// Star of `mass` at `age` billion years.
  pub fn evolve(mass: f64, age: f64) -> Self {
    if age > Self::lifetime(mass) {
      return Self::white_dwarf(mass);
    }

    let luminosity = mass.powf(3.5);
    let radius = mass.powf(0.8);
    let temperature = SOLAR_TEMPERATURE * (luminosity / (radius * radius)).powf(0.25);
    Self {
      mass,
      luminosity,
      radius,
      temperature,
      class: StellarClass::from_temperature(temperature),
    }
  }

  /// Remnant of a progenitor of `initial_mass`.
  fn white_dwarf(initial_mass: f64) -> Self {
    let mass = (0.4 + 0.1 * initial_mass).min(1.4);
    Self {
      mass,
      luminosity: 1.0e-3,
      radius: 0.012,
      temperature: 10_000.0,
      class: StellarClass::WhiteDwarf,
    }
  }
}

/// Everything needed to regenerate a full system on demand.
#[derive(Clone, Debug, PartialEq)]
pub struct StarSystemInfo {
  pub name: String,
  /// Age in billions of years.
  pub age: f64,
  /// Member stars, heaviest first.
  pub stars: Vec<Star>,
  /// Planet-forming mass budget in solar masses.
  pub remaining_mass: f64,
}

impl StarSystemInfo {
  /// Roll a system with a total stellar mass in `[mass_min, mass_max]` and an
  /// age in `[age_min, age_max]`.
  ///
  /// Inverted ranges collapse to their lower bound.
  pub fn roll(
    rng: &mut impl Rng,
    mass_min: f64,
    mass_max: f64,
    age_min: f64,
    age_max: f64,
  ) -> Self {
    let total_mass = sample_log_range(rng, mass_min, mass_max).unwrap_or(mass_min);
    let age = sample_range(rng, age_min, age_max).unwrap_or(age_min);
    let count = *choose_weighted(rng, &MULTIPLICITY_WEIGHTS);

    let mut shares: Vec<f64> = (0..count).map(|_| rng.random_range(0.2..=1.0)).collect();
    shares.sort_by(|a, b| b.total_cmp(a));
    let share_sum: f64 = shares.iter().sum();

    let stars = shares
      .iter()
      .map(|share| Star::evolve(total_mass * share / share_sum, age))
      .collect();
    let remaining_mass = total_mass * rng.random_range(DISC_FRACTION_MIN..=DISC_FRACTION_MAX);

    Self {
      name: system_name(rng),
      age,
      stars,
      remaining_mass,
    }
  }

  pub fn stellar_mass(&self) -> f64 {
    self.stars.iter().map(|star| star.mass).sum()
  }

  /// Class of the heaviest star.
  pub fn primary_class(&self) -> Option<StellarClass> {
    self.stars.first().map(|star| star.class)
  }
}

/// Two or three syllables, capitalised, with an occasional catalogue number.
pub fn system_name(rng: &mut impl Rng) -> String {
  let syllables = rng.random_range(2..=3);
  let mut name = String::new();
  for _ in 0..syllables {
    name.push_str(SYLLABLES[rng.random_range(0..SYLLABLES.len())]);
  }

  let mut name: String = name
    .char_indices()
    .map(|(i, c)| if i == 0 { c.to_ascii_uppercase() } else { c })
    .collect();

  if rng.random_bool(0.25) {
    name.push_str(&format!(" {}", rng.random_range(2..=999)));
  }
  name
}
