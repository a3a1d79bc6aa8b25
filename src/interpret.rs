//! Maps a verdict category to what the user sees.

use crate::model::Category;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccentTheme {
    Authentic,
    Manipulated,
    Indeterminate,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presentation {
    pub accent: AccentTheme,
    pub headline: &'static str,
    pub guidance: &'static [&'static str],
}

pub const HEADLINE_AUTHENTIC: &str = "Authentic Video";
pub const HEADLINE_MANIPULATED: &str = "Deepfake Detected";
pub const HEADLINE_INDETERMINATE: &str = "Suspicious Content";
pub const HEADLINE_UNRECOGNIZED: &str = "Unrecognized Verdict";

const AUTHENTIC_GUIDANCE: &[&str] = &[
    "No signs of facial manipulation were found in the sampled frames.",
    "The video appears consistent with genuine camera footage.",
    "Still verify the source before sharing sensitive content.",
];

const MANIPULATED_GUIDANCE: &[&str] = &[
    "Strong indicators of synthetic or altered faces were detected.",
    "Do not share or rely on this video as evidence.",
    "Report the content to the platform where you found it.",
];

const INDETERMINATE_GUIDANCE: &[&str] = &[
    "Some frames show patterns associated with manipulation.",
    "The evidence is not conclusive either way.",
    "Manual review by a trained analyst is recommended.",
];

const UNRECOGNIZED_GUIDANCE: &[&str] = &[
    "The service returned a verdict this client does not recognize.",
    "Treat the result as unverified and review it manually.",
];

/// Total over every category; unknown verdicts get the neutral presentation.
pub fn present(category: &Category) -> Presentation {
    match category {
        Category::Authentic => Presentation {
            accent: AccentTheme::Authentic,
            headline: HEADLINE_AUTHENTIC,
            guidance: AUTHENTIC_GUIDANCE,
        },
        Category::Manipulated => Presentation {
            accent: AccentTheme::Manipulated,
            headline: HEADLINE_MANIPULATED,
            guidance: MANIPULATED_GUIDANCE,
        },
        Category::Indeterminate => Presentation {
            accent: AccentTheme::Indeterminate,
            headline: HEADLINE_INDETERMINATE,
            guidance: INDETERMINATE_GUIDANCE,
        },
        Category::Unrecognized(_) => Presentation {
            accent: AccentTheme::Neutral,
            headline: HEADLINE_UNRECOGNIZED,
            guidance: UNRECOGNIZED_GUIDANCE,
        },
    }
}

/// Render a [0, 1] ratio as a percentage with one decimal place.
/// Ties round away from zero.
pub fn format_percent(ratio: f64) -> String {
    if !ratio.is_finite() {
        return "-".to_string();
    }
    let tenths = (ratio * 1000.0).round();
    // Avoid printing "-0.0%" for tiny negative inputs.
    let tenths = if tenths == 0.0 { 0.0 } else { tenths };
    format!("{:.1}%", tenths / 10.0)
}
