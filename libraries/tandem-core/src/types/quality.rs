//! Per-backend quality tiers and their fallback ladders

use serde::{Deserialize, Serialize};
use std::fmt;

/// Netease audio level, lowest to highest
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum NeteaseQuality {
    Standard,
    Higher,
    #[default]
    ExHigh,
    Lossless,
    HiRes,
    JyEffect,
    Sky,
    JyMaster,
}

impl NeteaseQuality {
    /// All tiers, highest first
    pub const DESCENDING: [NeteaseQuality; 8] = [
        NeteaseQuality::JyMaster,
        NeteaseQuality::Sky,
        NeteaseQuality::JyEffect,
        NeteaseQuality::HiRes,
        NeteaseQuality::Lossless,
        NeteaseQuality::ExHigh,
        NeteaseQuality::Higher,
        NeteaseQuality::Standard,
    ];

    /// Wire key sent as the `level` parameter
    pub fn key(&self) -> &'static str {
        match self {
            NeteaseQuality::Standard => "standard",
            NeteaseQuality::Higher => "higher",
            NeteaseQuality::ExHigh => "exhigh",
            NeteaseQuality::Lossless => "lossless",
            NeteaseQuality::HiRes => "hires",
            NeteaseQuality::JyEffect => "jyeffect",
            NeteaseQuality::Sky => "sky",
            NeteaseQuality::JyMaster => "jymaster",
        }
    }

    /// Parse a wire key
    pub fn from_key(key: &str) -> Option<Self> {
        Self::DESCENDING.into_iter().find(|q| q.key() == key)
    }

    /// Tiers to try, starting at `self` and degrading toward `Standard`
    pub fn ladder(self) -> impl Iterator<Item = NeteaseQuality> {
        Self::DESCENDING.into_iter().filter(move |q| *q <= self)
    }
}

impl fmt::Display for NeteaseQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Bilibili audio tier, highest first
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BiliQuality {
    Dolby,
    HiRes,
    Lossless,
    #[default]
    High,
    Medium,
    Low,
}

impl BiliQuality {
    const ORDER: [BiliQuality; 6] = [
        BiliQuality::Dolby,
        BiliQuality::HiRes,
        BiliQuality::Lossless,
        BiliQuality::High,
        BiliQuality::Medium,
        BiliQuality::Low,
    ];

    /// Settings key
    pub fn key(&self) -> &'static str {
        match self {
            BiliQuality::Dolby => "dolby",
            BiliQuality::HiRes => "hires",
            BiliQuality::Lossless => "lossless",
            BiliQuality::High => "high",
            BiliQuality::Medium => "medium",
            BiliQuality::Low => "low",
        }
    }

    /// Parse a settings key, falling back to `High`
    pub fn from_key(key: &str) -> Self {
        Self::ORDER
            .into_iter()
            .find(|q| q.key() == key)
            .unwrap_or(BiliQuality::High)
    }

    /// Minimum bitrate for bitrate-matched tiers
    pub fn min_bitrate_kbps(&self) -> u32 {
        match self {
            BiliQuality::Dolby => 0,
            BiliQuality::HiRes => 1000,
            BiliQuality::Lossless => 500,
            BiliQuality::High => 180,
            BiliQuality::Medium => 120,
            BiliQuality::Low => 60,
        }
    }

    /// Stream tag for tiers matched by tag rather than bitrate
    pub fn tag(&self) -> Option<&'static str> {
        match self {
            BiliQuality::Dolby => Some("dolby"),
            BiliQuality::HiRes => Some("hires"),
            _ => None,
        }
    }

    /// Tiers to try, starting at `self` and degrading toward `Low`
    pub fn degrade_chain(self) -> impl Iterator<Item = BiliQuality> {
        Self::ORDER.into_iter().skip_while(move |q| *q != self)
    }
}

impl fmt::Display for BiliQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// User quality preference for both backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QualityPreference {
    pub netease: NeteaseQuality,
    pub bili: BiliQuality,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn netease_ladder_degrades_from_preference() {
        let ladder: Vec<_> = NeteaseQuality::Lossless.ladder().collect();
        assert_eq!(
            ladder,
            vec![
                NeteaseQuality::Lossless,
                NeteaseQuality::ExHigh,
                NeteaseQuality::Higher,
                NeteaseQuality::Standard,
            ]
        );
    }

    #[test]
    fn netease_ladder_never_goes_above_preference() {
        for pref in NeteaseQuality::DESCENDING {
            assert!(pref.ladder().all(|q| q <= pref));
            assert_eq!(pref.ladder().next(), Some(pref));
        }
    }

    #[test]
    fn netease_keys_roundtrip() {
        for q in NeteaseQuality::DESCENDING {
            assert_eq!(NeteaseQuality::from_key(q.key()), Some(q));
        }
        assert_eq!(NeteaseQuality::from_key("ultra"), None);
    }

    #[test]
    fn bili_chain_starts_at_preference() {
        let chain: Vec<_> = BiliQuality::High.degrade_chain().collect();
        assert_eq!(
            chain,
            vec![BiliQuality::High, BiliQuality::Medium, BiliQuality::Low]
        );
        assert_eq!(BiliQuality::Dolby.degrade_chain().count(), 6);
    }

    #[test]
    fn bili_unknown_key_defaults_to_high() {
        assert_eq!(BiliQuality::from_key("bogus"), BiliQuality::High);
        assert_eq!(BiliQuality::from_key("low"), BiliQuality::Low);
    }

    #[test]
    fn preference_deserializes_from_keys() {
        let pref: QualityPreference =
            serde_json::from_str(r#"{"netease":"lossless","bili":"medium"}"#).unwrap();
        assert_eq!(pref.netease, NeteaseQuality::Lossless);
        assert_eq!(pref.bili, BiliQuality::Medium);
    }
}
