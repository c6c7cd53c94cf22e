use crate::core::render::pdf::Rgb;

/// Icon drawn at the start of a card title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryGlyph {
    Food,
    Health,
    Mental,
    Housing,
    Clothing,
    Work,
    Family,
    Culture,
    Generic,
}

// Order matters: "mental" is checked before "health".
const KEYWORDS: [(&[&str], CategoryGlyph); 8] = [
    (&["food"], CategoryGlyph::Food),
    (&["mental"], CategoryGlyph::Mental),
    (&["health"], CategoryGlyph::Health),
    (&["housing", "shelter"], CategoryGlyph::Housing),
    (&["cloth", "hygiene"], CategoryGlyph::Clothing),
    (&["work", "employment"], CategoryGlyph::Work),
    (&["family", "child"], CategoryGlyph::Family),
    (&["culture", "community", "indigenous"], CategoryGlyph::Culture),
];

impl CategoryGlyph {
    /// Case-insensitive substring match against the keyword table.
    pub fn for_category(category: &str) -> Self {
        let lowered = category.to_lowercase();
        KEYWORDS
            .iter()
            .find(|(words, _)| words.iter().any(|word| lowered.contains(word)))
            .map(|(_, glyph)| *glyph)
            .unwrap_or(CategoryGlyph::Generic)
    }

    pub fn emoji(self) -> &'static str {
        match self {
            CategoryGlyph::Food => "🍽️",
            CategoryGlyph::Health => "🩺",
            CategoryGlyph::Mental => "🧠",
            CategoryGlyph::Housing => "🏠",
            CategoryGlyph::Clothing => "🧥",
            CategoryGlyph::Work => "💼",
            CategoryGlyph::Family => "👨‍👩‍👧",
            CategoryGlyph::Culture => "🌿",
            CategoryGlyph::Generic => "⭐",
        }
    }

    /// Letter printed inside the badge; the base fonts cannot draw emoji.
    pub fn badge_letter(self) -> char {
        match self {
            CategoryGlyph::Food => 'F',
            CategoryGlyph::Health => 'H',
            CategoryGlyph::Mental => 'M',
            CategoryGlyph::Housing => 'S',
            CategoryGlyph::Clothing => 'C',
            CategoryGlyph::Work => 'W',
            CategoryGlyph::Family => 'K',
            CategoryGlyph::Culture => 'N',
            CategoryGlyph::Generic => '*',
        }
    }

    pub fn color(self) -> Rgb {
        match self {
            CategoryGlyph::Food => Rgb(214, 110, 40),
            CategoryGlyph::Health => Rgb(200, 50, 60),
            CategoryGlyph::Mental => Rgb(120, 80, 170),
            CategoryGlyph::Housing => Rgb(40, 100, 170),
            CategoryGlyph::Clothing => Rgb(150, 110, 70),
            CategoryGlyph::Work => Rgb(70, 80, 90),
            CategoryGlyph::Family => Rgb(220, 90, 140),
            CategoryGlyph::Culture => Rgb(0, 120, 90),
            CategoryGlyph::Generic => Rgb(200, 160, 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_matching() {
        assert_eq!(CategoryGlyph::for_category("food"), CategoryGlyph::Food);
        assert_eq!(CategoryGlyph::for_category("Health"), CategoryGlyph::Health);
        assert_eq!(CategoryGlyph::for_category("mental_health"), CategoryGlyph::Mental);
        assert_eq!(CategoryGlyph::for_category("Emergency Shelter"), CategoryGlyph::Housing);
        assert_eq!(CategoryGlyph::for_category("clothing"), CategoryGlyph::Clothing);
        assert_eq!(CategoryGlyph::for_category("employment"), CategoryGlyph::Work);
        assert_eq!(CategoryGlyph::for_category("family_support"), CategoryGlyph::Family);
        assert_eq!(CategoryGlyph::for_category("Indigenous culture"), CategoryGlyph::Culture);
        assert_eq!(CategoryGlyph::for_category("transport"), CategoryGlyph::Generic);
    }

    #[test]
    fn test_badge_letters_are_distinct() {
        let glyphs = [
            CategoryGlyph::Food,
            CategoryGlyph::Health,
            CategoryGlyph::Mental,
            CategoryGlyph::Housing,
            CategoryGlyph::Clothing,
            CategoryGlyph::Work,
            CategoryGlyph::Family,
            CategoryGlyph::Culture,
            CategoryGlyph::Generic,
        ];
        let mut letters: Vec<char> = glyphs.iter().map(|g| g.badge_letter()).collect();
        letters.sort_unstable();
        letters.dedup();
        assert_eq!(letters.len(), glyphs.len());
        assert_eq!(CategoryGlyph::Clothing.badge_letter(), 'C');
        assert_eq!(CategoryGlyph::Culture.badge_letter(), 'N');
    }
}
