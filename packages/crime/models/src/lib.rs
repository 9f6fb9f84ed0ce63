#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Incident attribute enumerations.
//!
//! Every incident carries five categorical attributes: crime type, severity,
//! precinct, weather and motive. Their domains are fixed here so that
//! one-hot encodings stay stable regardless of which values happen to appear
//! in a given batch. Each enum exposes its full domain through
//! [`Categorical::domain`] and a zero-based ordinal matching the integer codes
//! used by the incident store.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Shared behavior of the fixed incident attribute domains.
pub trait Categorical: Copy + Eq + Sized + 'static {
    /// Returns every variant in ordinal order.
    fn domain() -> &'static [Self];

    /// Zero-based position of this variant within [`Self::domain`].
    fn ordinal(self) -> usize;
}

/// Offense classification of an incident.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum CrimeType {
    Arson = 0,
    Assault = 1,
    Burglary = 2,
    Corruption = 3,
    Counterfeiting = 4,
    CyberCrime = 5,
    DomesticViolence = 6,
    DrugTrafficking = 7,
    Embezzlement = 8,
    Extortion = 9,
    Fraud = 10,
    HumanTrafficking = 11,
    Homicide = 12,
    IllegalPossessionOfFirearms = 13,
    Kidnapping = 14,
    Murder = 15,
    Rape = 16,
    Robbery = 17,
    Theft = 18,
    Vandalism = 19,
}

impl CrimeType {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Arson,
            Self::Assault,
            Self::Burglary,
            Self::Corruption,
            Self::Counterfeiting,
            Self::CyberCrime,
            Self::DomesticViolence,
            Self::DrugTrafficking,
            Self::Embezzlement,
            Self::Extortion,
            Self::Fraud,
            Self::HumanTrafficking,
            Self::Homicide,
            Self::IllegalPossessionOfFirearms,
            Self::Kidnapping,
            Self::Murder,
            Self::Rape,
            Self::Robbery,
            Self::Theft,
            Self::Vandalism,
        ]
    }
}

impl Categorical for CrimeType {
    fn domain() -> &'static [Self] {
        Self::all()
    }

    fn ordinal(self) -> usize {
        self as usize
    }
}

/// Assessed seriousness of an incident.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum Severity {
    /// Minor offenses with no injury or small losses
    Low = 0,
    /// Offenses with limited harm
    Medium = 1,
    /// Serious offenses (injury, significant loss)
    High = 2,
    /// Life-threatening or fatal offenses
    Critical = 3,
}

impl Severity {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Low, Self::Medium, Self::High, Self::Critical]
    }
}

impl Categorical for Severity {
    fn domain() -> &'static [Self] {
        Self::all()
    }

    fn ordinal(self) -> usize {
        self as usize
    }
}

/// Police district (barangay) an incident was reported in.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum Precinct {
    Alabang = 0,
    AyalaAlabang = 1,
    Bayanan = 2,
    Buli = 3,
    Cupang = 4,
    Poblacion = 5,
    Putatan = 6,
    Sucat = 7,
    Tunasan = 8,
}

impl Precinct {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Alabang,
            Self::AyalaAlabang,
            Self::Bayanan,
            Self::Buli,
            Self::Cupang,
            Self::Poblacion,
            Self::Putatan,
            Self::Sucat,
            Self::Tunasan,
        ]
    }
}

impl Categorical for Precinct {
    fn domain() -> &'static [Self] {
        Self::all()
    }

    fn ordinal(self) -> usize {
        self as usize
    }
}

/// Weather conditions at the time of an incident.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum Weather {
    Clear = 0,
    Cloudy = 1,
    Rain = 2,
    Thunderstorm = 3,
    Fog = 4,
    Typhoon = 5,
}

impl Weather {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Clear,
            Self::Cloudy,
            Self::Rain,
            Self::Thunderstorm,
            Self::Fog,
            Self::Typhoon,
        ]
    }
}

impl Categorical for Weather {
    fn domain() -> &'static [Self] {
        Self::all()
    }

    fn ordinal(self) -> usize {
        self as usize
    }
}

/// Recorded motive behind an incident.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum Motive {
    Anger = 0,
    Greed = 1,
    Jealousy = 2,
    Revenge = 3,
    Political = 4,
    SubstanceInfluence = 5,
    SelfDefense = 6,
    /// Motive not determined at time of report
    Unknown = 7,
}

impl Motive {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Anger,
            Self::Greed,
            Self::Jealousy,
            Self::Revenge,
            Self::Political,
            Self::SubstanceInfluence,
            Self::SelfDefense,
            Self::Unknown,
        ]
    }
}

impl Categorical for Motive {
    fn domain() -> &'static [Self] {
        Self::all()
    }

    fn ordinal(self) -> usize {
        self as usize
    }
}
