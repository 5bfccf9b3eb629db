use super::color;
use super::team::Team;

const ANIMALS: &[&str] = &[
    "wolf", "fox", "lion", "tiger", "bear", "bull", "ram", "eagle", "hawk", "falcon", "owl", "shark",
    "panther", "jaguar", "leopard", "cougar", "cat", "dog", "husky", "stallion", "mustang", "horse",
    "gorilla", "ape", "monkey", "dragon", "viper", "cobra", "raven", "crow", "cardinal", "dolphin",
    "bison", "buffalo", "coyote", "wolverine", "otter", "gator", "croc", "rhino", "hippo", "whale",
    "duck", "goose", "goat", "yak", "boar", "pig", "turtle", "phoenix", "griffin",
];

/// Whether the subject phrase names an animal (drives head vs. object framing).
pub fn is_animal(subject: &str) -> bool {
    let s = subject.to_lowercase();
    ANIMALS.iter().any(|a| s.contains(a))
}

/// A named style grammar, indexed by `Team::effective_style`.
pub struct LogoStyle {
    pub name: &'static str,
    animal_framing: &'static str,
    object_framing: &'static str,
    details: &'static str,
}

pub const STYLES: [LogoStyle; 6] = [
    LogoStyle {
        name: "Modern",
        animal_framing: "front-facing mascot head",
        object_framing: "object-only emblem",
        details: "sharp angular geometry, heavy outer stroke, bold negative space cuts, high contrast",
    },
    LogoStyle {
        name: "Geometric",
        animal_framing: "front-facing mascot head",
        object_framing: "object-only emblem",
        details: "simplified geometric primitives, symmetrical, minimal details, clean modular forms",
    },
    LogoStyle {
        name: "Symmetric",
        animal_framing: "perfectly front-facing mascot head",
        object_framing: "centered object emblem",
        details: "strict mirror symmetry, thick outline, balanced proportions",
    },
    LogoStyle {
        name: "Dynamic",
        animal_framing: "3/4 view mascot head",
        object_framing: "angled object emblem",
        details: "forward motion cues, crisp edges, athletic energy",
    },
    LogoStyle {
        name: "Retro",
        animal_framing: "front-facing mascot head",
        object_framing: "object emblem",
        details: "chunky simplified shapes, flat blocks, classic patch-style",
    },
    LogoStyle {
        name: "Rounded",
        animal_framing: "front-facing mascot head",
        object_framing: "object emblem",
        details: "soft curves, friendly geometry, smooth silhouette",
    },
];

impl LogoStyle {
    pub fn phrase(&self, animal: bool) -> String {
        let framing = if animal { self.animal_framing } else { self.object_framing };
        format!("{framing}, {}", self.details)
    }
}

/// Assemble the text prompt for one team.
pub fn build_prompt(team: &Team) -> String {
    let subject = team.subject();
    let animal = is_animal(subject);
    let style = &STYLES[team.effective_style() as usize % STYLES.len()];

    let primary = color::sanitize(&team.primary);
    let secondary = color::sanitize(&team.secondary);

    let palette = format!(
        "STRICT PALETTE: primary {} ({primary}) and secondary {} ({secondary}), plus WHITE (#FFFFFF) and BLACK (#000000) only. \
         Flat solid fills ONLY, no gradients, no extra hues.",
        color::describe(&primary),
        color::describe(&secondary),
    );

    let mut negatives = String::from(
        "no text, no letters, no numbers, no monogram, no shield, no crest, no badge, no border text, ",
    );
    if animal {
        negatives.push_str("no circle, no ring, no circular border, ");
    }
    negatives.push_str("no banner, no watermark, no background graphics, no gradient background, no scene");

    format!(
        "professional sports team logo, {}; Mascot phrase: \"{subject}\", depict a SINGLE {} emblem. \
         centered composition, flat vector design, crisp edges, heavy black outline, PURE WHITE (#FFFFFF) BACKGROUND. \
         {palette} {negatives}.",
        style.phrase(animal),
        if animal { "animal head" } else { "object" },
    )
}

/// Locator of the rendered image for `team` at `size`×`size`.
pub fn generation_url(base_url: &str, team: &Team, size: u32) -> String {
    let prompt = build_prompt(team);
    format!(
        "{}/prompt/{}?seed={}&width={size}&height={size}&nologo=true",
        base_url.trim_end_matches('/'),
        urlencoding::encode(&prompt),
        team.seed,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::team::demo_teams;

    #[test]
    fn test_is_animal() {
        assert!(is_animal("Snarling Wolf"));
        assert!(!is_animal("grenade"));
    }

    #[test]
    fn test_prompt_mentions_palette_and_subject() {
        let team = demo_teams().remove(0);
        let p = build_prompt(&team);
        assert!(p.contains("\"wolf\""));
        assert!(p.contains("#00338D"));
        assert!(p.contains("#C60C30"));
        assert!(p.contains("no circle"));
    }

    #[test]
    fn test_object_subject_allows_circles() {
        let mut team = demo_teams().remove(0);
        team.mascot = "grenade".into();
        let p = build_prompt(&team);
        assert!(!p.contains("no circle"));
        assert!(p.contains("SINGLE object emblem"));
    }

    #[test]
    fn test_style_selected_by_index() {
        let mut team = demo_teams().remove(0);
        team.style = Some(4);
        assert!(build_prompt(&team).contains(STYLES[4].phrase(true).as_str()));
    }

    #[test]
    fn test_generation_url_shape() {
        let team = demo_teams().remove(2);
        let url = generation_url("https://image.example/", &team, 1024);
        assert!(url.starts_with("https://image.example/prompt/professional%20sports"));
        assert!(url.ends_with("?seed=5177&width=1024&height=1024&nologo=true"));
    }
}
