use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::model::PoinoError;

/// Number of slots in the grouped phoneme table the prosody models were
/// trained against (41 symbols plus the group separators).
pub const PHONEME_TABLE_LEN: usize = 62;

macro_rules! kana_table {
    ($($variant:ident => ($kana:literal, $romaji:literal)),+ $(,)?) => {
        /// One Japanese mora symbol (kana), including the pause mark `、`.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Kana {
            $($variant),+
        }

        impl Kana {
            /// Every mora, in table order.
            pub const ALL: &'static [Kana] = &[$(Kana::$variant),+];

            /// The kana spelling of this mora.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Kana::$variant => $kana),+
                }
            }

            /// The romanized spelling, which is also the concatenation of
            /// its phoneme symbols.
            pub fn romaji(self) -> &'static str {
                match self {
                    $(Kana::$variant => $romaji),+
                }
            }
        }
    };
}

macro_rules! phoneme_table {
    ($($variant:ident => ($symbol:literal, $slot:literal)),+ $(,)?) => {
        /// One phonetic unit as emitted by the label analyzer.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Phoneme {
            $($variant),+
        }

        impl Phoneme {
            /// Every phoneme, in table order.
            pub const ALL: &'static [Phoneme] = &[$(Phoneme::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(Phoneme::$variant => $symbol),+
                }
            }

            /// Slot of this phoneme in the grouped table of
            /// [`PHONEME_TABLE_LEN`] entries.
            pub fn slot(self) -> usize {
                match self {
                    $(Phoneme::$variant => $slot),+
                }
            }
        }
    };
}

kana_table! {
    Pau => ("、", "pau"),
    Kya => ("きゃ", "kya"),
    Kyu => ("きゅ", "kyu"),
    Kye => ("きぇ", "kye"),
    Kyo => ("きょ", "kyo"),
    Gya => ("ぎゃ", "gya"),
    Gyu => ("ぎゅ", "gyu"),
    Gye => ("ぎぇ", "gye"),
    Gyo => ("ぎょ", "gyo"),
    Kwa => ("くゎ", "kwa"),
    Gwa => ("ぐゎ", "gwa"),
    Sha => ("しゃ", "sha"),
    Shi => ("し", "shi"),
    Shu => ("しゅ", "shu"),
    She => ("しぇ", "she"),
    Sho => ("しょ", "sho"),
    Cha => ("ちゃ", "cha"),
    Chi => ("ち", "chi"),
    Chu => ("ちゅ", "chu"),
    Che => ("ちぇ", "che"),
    Cho => ("ちょ", "cho"),
    Tsa => ("つぁ", "tsa"),
    Tsi => ("つぃ", "tsi"),
    Tsu => ("つ", "tsu"),
    Tse => ("つぇ", "tse"),
    Tso => ("つぉ", "tso"),
    Tya => ("てゃ", "tya"),
    Tyu => ("てゅ", "tyu"),
    Tyo => ("てょ", "tyo"),
    Dya => ("でゃ", "dya"),
    Dyu => ("でゅ", "dyu"),
    Dyo => ("でょ", "dyo"),
    Nya => ("にゃ", "nya"),
    Nyu => ("にゅ", "nyu"),
    Nye => ("にぇ", "nye"),
    Nyo => ("にょ", "nyo"),
    Hya => ("ひゃ", "hya"),
    Hyu => ("ひゅ", "hyu"),
    Hye => ("ひぇ", "hye"),
    Hyo => ("ひょ", "hyo"),
    Bya => ("びゃ", "bya"),
    Byu => ("びゅ", "byu"),
    Bye => ("びぇ", "bye"),
    Byo => ("びょ", "byo"),
    Pya => ("ぴゃ", "pya"),
    Pyu => ("ぴゅ", "pyu"),
    Pye => ("ぴぇ", "pye"),
    Pyo => ("ぴょ", "pyo"),
    Mya => ("みゃ", "mya"),
    Myu => ("みゅ", "myu"),
    Mye => ("みぇ", "mye"),
    Myo => ("みょ", "myo"),
    Rya => ("りゃ", "rya"),
    Ryu => ("りゅ", "ryu"),
    Rye => ("りぇ", "rye"),
    Ryo => ("りょ", "ryo"),
    Cl => ("っ", "cl"),
    Ye => ("いぇ", "ye"),
    Ka => ("か", "ka"),
    Ki => ("き", "ki"),
    Ku => ("く", "ku"),
    Ke => ("け", "ke"),
    Ko => ("こ", "ko"),
    Sa => ("さ", "sa"),
    Si => ("すぃ", "si"),
    Su => ("す", "su"),
    Se => ("せ", "se"),
    So => ("そ", "so"),
    Ta => ("た", "ta"),
    Ti => ("てぃ", "ti"),
    Tu => ("とぅ", "tu"),
    Te => ("て", "te"),
    To => ("と", "to"),
    Na => ("な", "na"),
    Ni => ("に", "ni"),
    Nu => ("ぬ", "nu"),
    Ne => ("ね", "ne"),
    No => ("の", "no"),
    Ha => ("は", "ha"),
    Hi => ("ひ", "hi"),
    He => ("へ", "he"),
    Ho => ("ほ", "ho"),
    Ma => ("ま", "ma"),
    Mi => ("み", "mi"),
    Mu => ("む", "mu"),
    Me => ("め", "me"),
    Mo => ("も", "mo"),
    Ya => ("や", "ya"),
    Yu => ("ゆ", "yu"),
    Yo => ("よ", "yo"),
    Ra => ("ら", "ra"),
    Ri => ("り", "ri"),
    Ru => ("る", "ru"),
    Re => ("れ", "re"),
    Ro => ("ろ", "ro"),
    Wa => ("わ", "wa"),
    Wi => ("うぃ", "wi"),
    We => ("うぇ", "we"),
    Wo => ("うぉ", "wo"),
    Fa => ("ふぁ", "fa"),
    Fi => ("ふぃ", "fi"),
    Fu => ("ふ", "fu"),
    Fe => ("ふぇ", "fe"),
    Fo => ("ふぉ", "fo"),
    Va => ("ゔぁ", "va"),
    Vi => ("ゔぃ", "vi"),
    Vu => ("ゔ", "vu"),
    Ve => ("ゔぇ", "ve"),
    Vo => ("ゔぉ", "vo"),
    Ga => ("が", "ga"),
    Gi => ("ぎ", "gi"),
    Gu => ("ぐ", "gu"),
    Ge => ("げ", "ge"),
    Go => ("ご", "go"),
    Za => ("ざ", "za"),
    Zi => ("ずぃ", "zi"),
    Zu => ("ず", "zu"),
    Ze => ("ぜ", "ze"),
    Zo => ("ぞ", "zo"),
    Ja => ("じゃ", "ja"),
    Ji => ("じ", "ji"),
    Ju => ("じゅ", "ju"),
    Je => ("じぇ", "je"),
    Jo => ("じょ", "jo"),
    Da => ("だ", "da"),
    Di => ("でぃ", "di"),
    Du => ("どぅ", "du"),
    De => ("で", "de"),
    Do => ("ど", "do"),
    Ba => ("ば", "ba"),
    Bi => ("び", "bi"),
    Bu => ("ぶ", "bu"),
    Be => ("べ", "be"),
    Bo => ("ぼ", "bo"),
    Pa => ("ぱ", "pa"),
    Pi => ("ぴ", "pi"),
    Pu => ("ぷ", "pu"),
    Pe => ("ぺ", "pe"),
    Po => ("ぽ", "po"),
    A => ("あ", "a"),
    I => ("い", "i"),
    U => ("う", "u"),
    E => ("え", "e"),
    O => ("お", "o"),
    N => ("ん", "N"),

}

phoneme_table! {
    Sil => ("sil", 0),
    Pau => ("pau", 1),
    A => ("a", 3),
    I => ("i", 4),
    U => ("u", 5),
    E => ("e", 6),
    O => ("o", 7),
    MoraicN => ("N", 9),
    K => ("k", 11),
    Kw => ("kw", 12),
    Ky => ("ky", 13),
    S => ("s", 15),
    Sh => ("sh", 16),
    T => ("t", 18),
    Ts => ("ts", 19),
    Ty => ("ty", 20),
    Ch => ("ch", 22),
    N => ("n", 24),
    Ny => ("ny", 25),
    H => ("h", 27),
    Hy => ("hy", 28),
    M => ("m", 30),
    My => ("my", 31),
    Y => ("y", 33),
    R => ("r", 35),
    Ry => ("ry", 36),
    W => ("w", 38),
    B => ("b", 40),
    By => ("by", 41),
    D => ("d", 43),
    Dy => ("dy", 44),
    G => ("g", 46),
    Gw => ("gw", 47),
    Gy => ("gy", 48),
    J => ("j", 50),
    V => ("v", 52),
    F => ("f", 54),
    Z => ("z", 56),
    P => ("p", 58),
    Py => ("py", 59),
    Cl => ("cl", 61),
}

static KANA_BY_SYMBOL: Lazy<HashMap<&'static str, Kana>> =
    Lazy::new(|| Kana::ALL.iter().map(|&k| (k.as_str(), k)).collect());

static KANA_BY_ROMAJI: Lazy<HashMap<&'static str, Kana>> =
    Lazy::new(|| Kana::ALL.iter().map(|&k| (k.romaji(), k)).collect());

/// Phoneme alphabet sorted longest symbol first, so `sh` wins over `s`.
static PHONEMES_LONGEST_FIRST: Lazy<Vec<Phoneme>> = Lazy::new(|| {
    let mut sorted = Phoneme::ALL.to_vec();
    sorted.sort_by(|a, b| b.as_str().len().cmp(&a.as_str().len()));
    sorted
});

impl Kana {
    /// Look up the mora whose romanization is exactly `romaji`.
    pub fn from_romaji(romaji: &str) -> Option<Kana> {
        KANA_BY_ROMAJI.get(romaji).copied()
    }

    /// Split the romanization into phonemes by greedy longest match.
    pub fn phonemes(self) -> Vec<Phoneme> {
        tokenize_romaji(self.romaji())
    }
}

fn tokenize_romaji(romaji: &str) -> Vec<Phoneme> {
    let mut tokens = Vec::new();
    let mut rest = romaji;

    while !rest.is_empty() {
        match PHONEMES_LONGEST_FIRST
            .iter()
            .find(|p| rest.starts_with(p.as_str()))
        {
            Some(&phoneme) => {
                tokens.push(phoneme);
                rest = &rest[phoneme.as_str().len()..];
            }
            None => {
                // Unmatched characters are skipped, like a regex scan would.
                let skip = rest.chars().next().map(char::len_utf8).unwrap_or(1);
                rest = &rest[skip..];
            }
        }
    }

    tokens
}

impl Phoneme {
    /// Model input feature: the table slot normalized to `[0, 1)`.
    pub fn feature(self) -> f32 {
        self.slot() as f32 / PHONEME_TABLE_LEN as f32
    }

    /// Map a raw label symbol to a phoneme. Everything except the moraic
    /// nasal `N` is compared lower-cased; unknown symbols become silence.
    pub fn from_label_symbol(symbol: &str) -> Phoneme {
        let normalized = if symbol == "N" {
            symbol.to_string()
        } else {
            symbol.to_lowercase()
        };
        normalized.parse().unwrap_or(Phoneme::Sil)
    }
}

impl FromStr for Kana {
    type Err = PoinoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KANA_BY_SYMBOL
            .get(s)
            .copied()
            .ok_or_else(|| PoinoError::UnknownKana(s.to_string()))
    }
}

impl FromStr for Phoneme {
    type Err = PoinoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Phoneme::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| PoinoError::Validation(format!("unknown phoneme {s:?}")))
    }
}

impl fmt::Display for Kana {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Phoneme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Kana {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Kana {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for Phoneme {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Phoneme {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Two-level Japanese pitch accent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accent {
    High,
    #[default]
    Low,
}

impl Accent {
    /// Binary model feature: 1 for high, 0 for low.
    pub fn flag(self) -> f32 {
        match self {
            Accent::High => 1.0,
            Accent::Low => 0.0,
        }
    }
}

/// Articulatory class selecting a spectral envelope and amplitude preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvKey {
    A,
    I,
    U,
    E,
    O,
    K,
    S,
    T,
    N,
    H,
    M,
    Y,
    R,
    W,
    G,
    Z,
    D,
    B,
    P,
    V,
    /// Closure and pause.
    Q,
}

impl EnvKey {
    pub const ALL: [EnvKey; 21] = [
        EnvKey::A,
        EnvKey::I,
        EnvKey::U,
        EnvKey::E,
        EnvKey::O,
        EnvKey::K,
        EnvKey::S,
        EnvKey::T,
        EnvKey::N,
        EnvKey::H,
        EnvKey::M,
        EnvKey::Y,
        EnvKey::R,
        EnvKey::W,
        EnvKey::G,
        EnvKey::Z,
        EnvKey::D,
        EnvKey::B,
        EnvKey::P,
        EnvKey::V,
        EnvKey::Q,
    ];

    /// Fixed amplitude weight used by the volume envelope.
    pub fn volume(self) -> f64 {
        match self {
            EnvKey::K | EnvKey::S | EnvKey::P => 0.05,
            EnvKey::H => 0.10,
            EnvKey::T | EnvKey::G | EnvKey::Z | EnvKey::D | EnvKey::B | EnvKey::V => 0.30,
            _ => 1.00,
        }
    }

    pub fn is_vowel(self) -> bool {
        matches!(self, EnvKey::A | EnvKey::I | EnvKey::U | EnvKey::E | EnvKey::O)
    }

    /// Classes always rendered with noise excitation.
    pub fn is_unvoiced(self) -> bool {
        matches!(self, EnvKey::K | EnvKey::S | EnvKey::H)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_have_expected_sizes() {
        assert_eq!(Kana::ALL.len(), 145);
        assert_eq!(Phoneme::ALL.len(), 41);
        assert_eq!(EnvKey::ALL.len(), 21);
    }

    #[test]
    fn every_kana_decomposes_and_recomposes() {
        for &kana in Kana::ALL {
            let phonemes = kana.phonemes();
            assert!(!phonemes.is_empty(), "{kana} has no phonemes");
            let joined: String = phonemes.iter().map(|p| p.as_str()).collect();
            assert_eq!(Kana::from_romaji(&joined), Some(kana));
        }
    }

    #[test]
    fn longest_symbol_wins_during_tokenization() {
        assert_eq!(Kana::Shi.phonemes(), vec![Phoneme::Sh, Phoneme::I]);
        assert_eq!(Kana::Tsu.phonemes(), vec![Phoneme::Ts, Phoneme::U]);
        assert_eq!(Kana::Si.phonemes(), vec![Phoneme::S, Phoneme::I]);
        assert_eq!(Kana::Pau.phonemes(), vec![Phoneme::Pau]);
        assert_eq!(Kana::N.phonemes(), vec![Phoneme::MoraicN]);
    }

    #[test]
    fn parses_kana_symbols() {
        assert_eq!("きゃ".parse::<Kana>().unwrap(), Kana::Kya);
        assert_eq!("、".parse::<Kana>().unwrap(), Kana::Pau);
        assert!(matches!("x".parse::<Kana>(), Err(PoinoError::UnknownKana(_))));
    }

    #[test]
    fn label_symbols_are_normalized() {
        assert_eq!(Phoneme::from_label_symbol("N"), Phoneme::MoraicN);
        assert_eq!(Phoneme::from_label_symbol("n"), Phoneme::N);
        assert_eq!(Phoneme::from_label_symbol("U"), Phoneme::U);
        assert_eq!(Phoneme::from_label_symbol("xx"), Phoneme::Sil);
    }

    #[test]
    fn phoneme_features_are_in_unit_range() {
        for &p in Phoneme::ALL {
            let f = p.feature();
            assert!((0.0..1.0).contains(&f));
        }
        assert_eq!(Phoneme::Sil.feature(), 0.0);
        assert_eq!(Phoneme::A.feature(), 3.0 / 62.0);
    }

    #[test]
    fn serde_uses_kana_spelling() {
        let json = serde_json::to_string(&Kana::Po).unwrap();
        assert_eq!(json, "\"ぽ\"");
        let back: Kana = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Kana::Po);
        let key: EnvKey = serde_json::from_str("\"q\"").unwrap();
        assert_eq!(key, EnvKey::Q);
    }
}
