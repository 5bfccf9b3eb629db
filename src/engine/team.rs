use std::sync::{Arc, Mutex, MutexGuard};

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::color::{self, Color};

/// Number of style grammars a team can pick from (`style` is `0..STYLE_COUNT`).
pub const STYLE_COUNT: u8 = 6;

/// Seed range used when none is supplied.
const SEED_MAX: u32 = 10_000;

// ============================================================================
// Teams
// ============================================================================

/// A fully-populated generation request entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub mascot: String,
    /// Sanitized color text (uppercase hex or a known lowercase name).
    pub primary: String,
    pub secondary: String,
    pub seed: u32,
    pub style: Option<u8>,
    pub logo_url: Option<String>,
    pub generating: bool,
}

impl Team {
    pub fn primary_color(&self) -> Color {
        Color::from_user_input(&self.primary)
    }

    pub fn secondary_color(&self) -> Color {
        Color::from_user_input(&self.secondary)
    }

    /// Subject phrase for the generator: mascot, or the team name when blank.
    pub fn subject(&self) -> &str {
        let m = self.mascot.trim();
        if m.is_empty() {
            self.name.trim()
        } else {
            m
        }
    }

    /// Explicit style, or one derived from the seed.
    pub fn effective_style(&self) -> u8 {
        self.style
            .filter(|s| *s < STYLE_COUNT)
            .unwrap_or((self.seed % STYLE_COUNT as u32) as u8)
    }
}

/// Partially-specified team as it arrives from an import or the user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamDraft {
    pub id: Option<String>,
    pub name: Option<String>,
    pub owner: Option<String>,
    pub mascot: Option<String>,
    pub primary: Option<String>,
    pub secondary: Option<String>,
    pub seed: Option<i64>,
    pub style: Option<i64>,
    pub logo_url: Option<String>,
}

impl TeamDraft {
    /// Normalize into a [`Team`]. `index` is the draft's position in its list;
    /// it fills in a missing id/name and picks the preset palette slot.
    pub fn normalize(self, index: usize) -> Team {
        let name = non_blank(self.name).unwrap_or_else(|| format!("Team {}", index + 1));
        let mascot = non_blank(self.mascot).unwrap_or_else(|| derive_mascot(&name).to_string());
        let preset = &PRESET_PALETTE[index % PRESET_PALETTE.len()];

        Team {
            id: non_blank(self.id).unwrap_or_else(|| (index + 1).to_string()),
            owner: self.owner.unwrap_or_default().trim().to_string(),
            mascot,
            primary: color::sanitize(&non_blank(self.primary).unwrap_or_else(|| preset.primary.into())),
            secondary: color::sanitize(&non_blank(self.secondary).unwrap_or_else(|| preset.secondary.into())),
            seed: self
                .seed
                .filter(|s| *s > 0)
                .and_then(|s| u32::try_from(s).ok())
                .unwrap_or_else(random_seed),
            style: self
                .style
                .filter(|s| (0..STYLE_COUNT as i64).contains(s))
                .map(|s| s as u8),
            logo_url: non_blank(self.logo_url),
            generating: false,
            name,
        }
    }
}

/// Patch applied by user edits. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTeamInput {
    pub name: Option<String>,
    pub owner: Option<String>,
    pub mascot: Option<String>,
    pub primary: Option<String>,
    pub secondary: Option<String>,
    /// Raw seed text; malformed values become 1.
    pub seed: Option<String>,
    pub style: Option<Option<u8>>,
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

pub fn random_seed() -> u32 {
    rand::thread_rng().gen_range(1..=SEED_MAX)
}

/// Parse user seed text. Non-numeric or non-positive input becomes 1.
pub fn parse_seed(text: &str) -> u32 {
    text.trim().parse::<u32>().ok().filter(|s| *s > 0).unwrap_or(1)
}

/// `"Night Tigers"` → `"Night_Tigers_logo.png"`.
pub fn download_file_name(team_name: &str, extension: &str) -> String {
    let stem = team_name.split_whitespace().collect::<Vec<_>>().join("_");
    let stem = if stem.is_empty() { "team".to_string() } else { stem };
    format!("{stem}_logo.{extension}")
}

// ============================================================================
// Mascot derivation
// ============================================================================

const MASCOT_KEYWORDS: &[(&str, &str)] = &[
    ("bears", "bear"), ("cubs", "bear"),
    ("lions", "lion"), ("tigers", "tiger"),
    ("timberwolves", "wolf"), ("wolfpack", "wolf"), ("wolves", "wolf"),
    ("eagles", "eagle"), ("hawks", "hawk"), ("falcons", "falcon"),
    ("ravens", "raven"), ("crows", "raven"),
    ("broncos", "stallion"), ("mustangs", "stallion"), ("colts", "stallion"), ("horses", "stallion"),
    ("panthers", "panther"), ("jaguars", "jaguar"), ("leopards", "leopard"),
    ("sharks", "shark"), ("dolphins", "dolphin"),
    ("bulls", "bull"), ("bison", "bison"), ("buffaloes", "bison"),
    ("vikings", "viking"), ("knights", "knight"), ("pirates", "pirate"), ("buccaneers", "pirate"),
    ("rams", "ram"), ("foxes", "fox"), ("gorillas", "gorilla"),
    ("gators", "alligator"), ("crocodiles", "crocodile"), ("dragons", "dragon"),
];

const FALLBACK_MASCOTS: &[&str] = &[
    "wolf", "bear", "eagle", "hawk", "dragon", "knight", "viking", "pirate", "bull",
    "tiger", "panther", "raven", "shark", "stallion", "bison", "ram", "fox", "gorilla",
];

/// Guess a mascot from a team name. Deterministic; `"wolf"` when nothing matches.
pub fn derive_mascot(name: &str) -> &'static str {
    let n = name.to_lowercase();
    MASCOT_KEYWORDS
        .iter()
        .find(|(k, _)| n.contains(k))
        .map(|(_, m)| *m)
        .or_else(|| FALLBACK_MASCOTS.iter().find(|m| n.contains(*m)).copied())
        .unwrap_or("wolf")
}

// ============================================================================
// Preset palette + demo league
// ============================================================================

pub struct PresetColors {
    pub name: &'static str,
    pub primary: &'static str,
    pub secondary: &'static str,
}

pub const PRESET_PALETTE: &[PresetColors] = &[
    PresetColors { name: "Chiefs", primary: "#E31837", secondary: "#FFB612" },
    PresetColors { name: "Packers", primary: "#203731", secondary: "#FFB612" },
    PresetColors { name: "Bears", primary: "#0B162A", secondary: "#C83803" },
    PresetColors { name: "Broncos", primary: "#0A2342", secondary: "#FB4F14" },
    PresetColors { name: "Seahawks", primary: "#002244", secondary: "#69BE28" },
    PresetColors { name: "Vikings", primary: "#4F2683", secondary: "#FFC62F" },
    PresetColors { name: "Dolphins", primary: "#008E97", secondary: "#FC4C02" },
    PresetColors { name: "49ers", primary: "#AA0000", secondary: "#B3995D" },
    PresetColors { name: "Raiders", primary: "#000000", secondary: "#A5ACAF" },
    PresetColors { name: "Cowboys", primary: "#041E42", secondary: "#869397" },
    PresetColors { name: "Giants", primary: "#0B2265", secondary: "#A71930" },
    PresetColors { name: "Bills", primary: "#00338D", secondary: "#C60C30" },
    PresetColors { name: "Jets", primary: "#125740", secondary: "#FFFFFF" },
    PresetColors { name: "Ravens", primary: "#241773", secondary: "#000000" },
    PresetColors { name: "Panthers", primary: "#0085CA", secondary: "#101820" },
    PresetColors { name: "Jaguars", primary: "#006778", secondary: "#9F792C" },
    PresetColors { name: "Saints", primary: "#101820", secondary: "#D3BC8D" },
    PresetColors { name: "Patriots", primary: "#002244", secondary: "#C60C30" },
    PresetColors { name: "Buccaneers", primary: "#D50A0A", secondary: "#34302B" },
    PresetColors { name: "Chargers", primary: "#0073CF", secondary: "#FFC20E" },
];

/// The built-in demo league.
pub fn demo_teams() -> Vec<Team> {
    const SAMPLES: &[(&str, &str, &str, &str, i64)] = &[
        ("Blue Wolves", "wolf", "#00338D", "#C60C30", 7123),
        ("Verdant Eagles", "eagle", "#203731", "#FFB612", 8142),
        ("Night Tigers", "tiger", "#0B162A", "#C83803", 5177),
        ("Mile High", "stallion", "#0A2342", "#FB4F14", 4409),
        ("Ravencrest", "raven", "#241773", "#000000", 1903),
        ("Carolina", "panther", "#0085CA", "#101820", 6611),
        ("Teal Fangs", "jaguar", "#006778", "#9F792C", 3302),
        ("Sound Sharks", "shark", "#002244", "#69BE28", 9281),
        ("Violet Knights", "knight", "#4F2683", "#FFC62F", 2845),
        ("Gold Bears", "bear", "#AA0000", "#B3995D", 1199),
        ("Nordic", "viking", "#4F2683", "#FFC62F", 4040),
        ("Prairie Bison", "bison", "#125740", "#FFFFFF", 9555),
    ];

    SAMPLES
        .iter()
        .enumerate()
        .map(|(i, (name, mascot, primary, secondary, seed))| {
            TeamDraft {
                name: Some(name.to_string()),
                owner: Some("Demo".into()),
                mascot: Some(mascot.to_string()),
                primary: Some(primary.to_string()),
                secondary: Some(secondary.to_string()),
                seed: Some(*seed),
                ..Default::default()
            }
            .normalize(i)
        })
        .collect()
}

// ============================================================================
// TeamRoster
// ============================================================================

/// Shared, ordered, in-memory team collection.
///
/// Concurrent generation tasks update `generating` / `logo_url` through
/// single locked assignments, so no update is ever observed half-written.
#[derive(Clone, Default)]
pub struct TeamRoster {
    teams: Arc<Mutex<Vec<Team>>>,
}

impl TeamRoster {
    pub fn new(teams: Vec<Team>) -> Self {
        Self {
            teams: Arc::new(Mutex::new(teams)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Team>> {
        self.teams.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Mutate one team in place. Returns `false` if the id is unknown.
    fn with_team(&self, id: &str, f: impl FnOnce(&mut Team)) -> bool {
        let mut teams = self.lock();
        match teams.iter_mut().find(|t| t.id == id) {
            Some(team) => {
                f(team);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn snapshot(&self) -> Vec<Team> {
        self.lock().clone()
    }

    pub fn get(&self, id: &str) -> Option<Team> {
        self.lock().iter().find(|t| t.id == id).cloned()
    }

    pub fn insert(&self, team: Team) {
        self.lock().push(team);
    }

    pub fn remove(&self, id: &str) -> Option<Team> {
        let mut teams = self.lock();
        let pos = teams.iter().position(|t| t.id == id)?;
        Some(teams.remove(pos))
    }

    /// Apply a user edit, sanitizing colors and seed on the way in.
    pub fn update(&self, id: &str, patch: UpdateTeamInput) -> bool {
        self.with_team(id, |t| {
            if let Some(name) = patch.name {
                t.name = name;
            }
            if let Some(owner) = patch.owner {
                t.owner = owner;
            }
            if let Some(mascot) = patch.mascot {
                t.mascot = mascot;
            }
            if let Some(primary) = patch.primary {
                t.primary = color::sanitize(&primary);
            }
            if let Some(secondary) = patch.secondary {
                t.secondary = color::sanitize(&secondary);
            }
            if let Some(seed) = patch.seed {
                t.seed = parse_seed(&seed);
            }
            if let Some(style) = patch.style {
                t.style = style.filter(|s| *s < STYLE_COUNT);
            }
        })
    }

    pub fn set_generating(&self, id: &str, generating: bool) -> bool {
        self.with_team(id, |t| t.generating = generating)
    }

    pub fn set_logo_url(&self, id: &str, url: String) -> bool {
        self.with_team(id, |t| t.logo_url = Some(url))
    }

    /// Draw a fresh variation seed for one team.
    pub fn reseed(&self, id: &str) -> bool {
        self.with_team(id, |t| t.seed = random_seed())
    }

    pub fn clear_logos(&self) {
        for t in self.lock().iter_mut() {
            t.logo_url = None;
        }
    }

    pub fn generating_count(&self) -> usize {
        self.lock().iter().filter(|t| t.generating).count()
    }

    /// Assign preset colors cycling by position.
    pub fn apply_preset_palette(&self) {
        for (i, t) in self.lock().iter_mut().enumerate() {
            let p = &PRESET_PALETTE[i % PRESET_PALETTE.len()];
            t.primary = p.primary.into();
            t.secondary = p.secondary.into();
        }
    }

    /// Assign a random preset to every team.
    pub fn remix_palette(&self) {
        let mut rng = rand::thread_rng();
        for t in self.lock().iter_mut() {
            let p = &PRESET_PALETTE[rng.gen_range(0..PRESET_PALETTE.len())];
            t.primary = p.primary.into();
            t.secondary = p.secondary.into();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_fills_defaults() {
        let t = TeamDraft {
            name: Some("  Arctic Foxes ".into()),
            ..Default::default()
        }
        .normalize(2);
        assert_eq!(t.id, "3");
        assert_eq!(t.name, "Arctic Foxes");
        assert_eq!(t.mascot, "fox");
        assert_eq!(t.primary, PRESET_PALETTE[2].primary);
        assert_eq!(t.secondary, PRESET_PALETTE[2].secondary);
        assert!((1..=SEED_MAX).contains(&t.seed));
        assert_eq!(t.style, None);
        assert!(!t.generating);
    }

    #[test]
    fn test_normalize_sanitizes_input() {
        let t = TeamDraft {
            id: Some("9".into()),
            name: Some("X".into()),
            primary: Some("banana".into()),
            secondary: Some("#abc".into()),
            seed: Some(-4),
            style: Some(7),
            ..Default::default()
        }
        .normalize(0);
        assert_eq!(t.primary, "#FFFFFF");
        assert_eq!(t.secondary, "#ABC");
        assert!(t.seed >= 1);
        assert_eq!(t.style, None);
    }

    #[test]
    fn test_missing_name_gets_placeholder() {
        let t = TeamDraft::default().normalize(4);
        assert_eq!(t.name, "Team 5");
        assert_eq!(t.mascot, "wolf");
    }

    #[test]
    fn test_derive_mascot() {
        assert_eq!(derive_mascot("Chicago Bears"), "bear");
        assert_eq!(derive_mascot("Tampa Buccaneers"), "pirate");
        assert_eq!(derive_mascot("Sky Dragon Riders"), "dragon");
        assert_eq!(derive_mascot("Timberwolves"), "wolf");
        assert_eq!(derive_mascot("Team 1"), "wolf");
    }

    #[test]
    fn test_subject_falls_back_to_name() {
        let mut t = demo_teams().remove(0);
        assert_eq!(t.subject(), "wolf");
        t.mascot = "   ".into();
        assert_eq!(t.subject(), "Blue Wolves");
    }

    #[test]
    fn test_effective_style() {
        let mut t = demo_teams().remove(0);
        t.seed = 7123;
        assert_eq!(t.effective_style(), (7123 % 6) as u8);
        t.style = Some(2);
        assert_eq!(t.effective_style(), 2);
    }

    #[test]
    fn test_parse_seed() {
        assert_eq!(parse_seed("42"), 42);
        assert_eq!(parse_seed("abc"), 1);
        assert_eq!(parse_seed("0"), 1);
        assert_eq!(parse_seed("-3"), 1);
    }

    #[test]
    fn test_download_file_name() {
        assert_eq!(download_file_name("Night  Tigers", "png"), "Night_Tigers_logo.png");
        assert_eq!(download_file_name("  ", "svg"), "team_logo.svg");
    }

    #[test]
    fn test_demo_teams() {
        let teams = demo_teams();
        assert_eq!(teams.len(), 12);
        assert_eq!(teams[11].secondary, "#FFFFFF");
        assert_eq!(teams[0].seed, 7123);
    }

    #[test]
    fn test_roster_update_and_flags() {
        let roster = TeamRoster::new(demo_teams());
        assert!(roster.update(
            "2",
            UpdateTeamInput {
                primary: Some("not a color".into()),
                seed: Some("x".into()),
                style: Some(Some(9)),
                ..Default::default()
            }
        ));
        let t = roster.get("2").unwrap();
        assert_eq!(t.primary, "#FFFFFF");
        assert_eq!(t.seed, 1);
        assert_eq!(t.style, None);

        assert!(roster.set_generating("2", true));
        assert_eq!(roster.generating_count(), 1);
        assert!(roster.set_logo_url("2", "https://x/y.png".into()));
        assert!(!roster.set_logo_url("nope", "u".into()));
        roster.clear_logos();
        assert!(roster.get("2").unwrap().logo_url.is_none());
    }

    #[test]
    fn test_reseed_draws_new_seed() {
        let mut team = demo_teams().remove(0);
        team.seed = 0;
        let roster = TeamRoster::new(vec![team]);

        assert!(roster.reseed("1"));
        let seed = roster.get("1").unwrap().seed;
        assert!((1..=SEED_MAX).contains(&seed));
        assert!(!roster.reseed("missing"));
    }

    #[test]
    fn test_roster_insert_remove() {
        let roster = TeamRoster::default();
        assert!(roster.is_empty());
        roster.insert(TeamDraft::default().normalize(0));
        assert_eq!(roster.len(), 1);
        assert!(roster.remove("1").is_some());
        assert!(roster.remove("1").is_none());
    }

    #[test]
    fn test_apply_preset_palette_cycles() {
        let roster = TeamRoster::new(demo_teams());
        roster.apply_preset_palette();
        let teams = roster.snapshot();
        assert_eq!(teams[0].primary, PRESET_PALETTE[0].primary);
        assert_eq!(teams[5].secondary, PRESET_PALETTE[5].secondary);
    }

    #[test]
    fn test_remix_uses_presets() {
        let roster = TeamRoster::new(demo_teams());
        roster.remix_palette();
        for t in roster.snapshot() {
            assert!(PRESET_PALETTE.iter().any(|p| p.primary == t.primary && p.secondary == t.secondary));
        }
    }
}
