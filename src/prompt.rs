//! Prompt template for the affiliate content generator.
//!
//! The generator sends a fixed multi-section instruction template to the text
//! model, with four user-supplied variables substituted in. The template also
//! carries a `{{index}}` token that is deliberately NOT substituted here: it
//! documents the per-angle numbering convention the model must follow in its
//! output, and must reach the model verbatim.

/// System instruction for the affiliate content generator model.
pub const GENERATOR_SYSTEM_PROMPT: &str = "Kamu adalah AI profesional untuk TikTok Affiliate. Tugasmu: menganalisis produk dari link, membuat 10 konsep video (angle), membuat prompt Veo 3, hook, script, caption, dan hashtag. Gunakan bahasa yang natural, menarik, dan cocok untuk FYP.";

/// User prompt template. Placeholders `{{product_link}}`, `{{visual_style}}`,
/// `{{ratio}}` and `{{tone}}` are substituted by [`render_user_prompt`];
/// `{{index}}` passes through untouched.
pub const USER_PROMPT_TEMPLATE: &str = r#"
Analisa link produk ini: {{product_link}}.

📌 Langkah kerja AI:
1. Deteksi nama produk
2. Deteksi kategori
3. Deteksi fitur utama
4. Deteksi masalah yang bisa diselesaikan
5. Tentukan target buyer
6. Deteksi selling point paling kuat

Setelah analisa → Buat **10 angle video** berikut:
1. Shock Value
2. Masalah – Solusi
3. Storytelling
4. Review Jujur
5. Before – After
6. POV
7. Lifestyle Aesthetic
8. Edukasi
9. Testimoni
10. Hard Sell Promo

Setiap angle WAJIB menghasilkan:
- Prompt Veo 3 lengkap, detail, dan sesuai gaya {{visual_style}}, rasio {{ratio}}.
- Hook 3–5 detik sangat menarik.
- Script video 6–12 detik.
- Caption jualan sesuai tone {{tone}}.
- Hashtag relevan + hashtag kategori.

===============================
FORMAT OUTPUT (WAJIB IKUTI)
===============================

NAMA PRODUK:
[hasil analisa nama produk]

KATEGORI:
[hasil analisa kategori]

FITUR UTAMA:
[list fitur]

MASALAH YANG DISELESAIKAN:
[list problem buyer]

TARGET BUYER:
[analisa target buyer]

SELLING POINT PALING KUAT:
[hasil analisa]

===============================
=== 10 ANGLE OUTPUT ===
===============================

Untuk setiap ANGLE 1-10 gunakan format ini:

--- ANGLE {{index}} ---
🎭 Tipe Angle: [Shock Value / Problem–Solusi / dll]

🎥 Prompt Veo 3:
[prompt sangat detail, sesuai gaya dan rasio]

⚡ Hook 3–5 detik:
[hook kuat, memancing penasaran]

🎬 Script Video 6–12 detik:
[alur video yang natural dan kuat]

✏️ Caption:
[caption sesuai tone]

🏷️ Hashtag:
#affiliate #tiktokshop #[kategori] #fyp #viraltiktok
"#;

/// Output aspect ratio for the generated video concepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ratio {
    /// 9:16 vertical, the TikTok default.
    #[default]
    Portrait,
    /// 16:9 horizontal.
    Landscape,
    /// 1:1 square.
    Square,
}

impl Ratio {
    /// All selectable ratios, in display order.
    pub const ALL: &'static [Ratio] = &[Ratio::Portrait, Ratio::Landscape, Ratio::Square];

    /// Parse a ratio from its label.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "9:16" => Some(Self::Portrait),
            "16:9" => Some(Self::Landscape),
            "1:1" => Some(Self::Square),
            _ => None,
        }
    }

    /// The label substituted into the template.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Portrait => "9:16",
            Self::Landscape => "16:9",
            Self::Square => "1:1",
        }
    }
}

impl std::fmt::Display for Ratio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Visual style the Veo prompts inside each angle should follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisualStyle {
    Realistic,
    #[default]
    HyperRealistic,
    Cinematic,
    Aesthetic,
    WarmIndonesiaRural,
    UrbanClean,
}

impl VisualStyle {
    /// All selectable styles, in display order.
    pub const ALL: &'static [VisualStyle] = &[
        VisualStyle::Realistic,
        VisualStyle::HyperRealistic,
        VisualStyle::Cinematic,
        VisualStyle::Aesthetic,
        VisualStyle::WarmIndonesiaRural,
        VisualStyle::UrbanClean,
    ];

    /// Parse a style from its label or kebab-case CLI spelling.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace(' ', "-").as_str() {
            "realistic" => Some(Self::Realistic),
            "hyper-realistic" => Some(Self::HyperRealistic),
            "cinematic" => Some(Self::Cinematic),
            "aesthetic" => Some(Self::Aesthetic),
            "warm-indonesia-rural" => Some(Self::WarmIndonesiaRural),
            "urban-clean" => Some(Self::UrbanClean),
            _ => None,
        }
    }

    /// The label substituted into the template.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Realistic => "Realistic",
            Self::HyperRealistic => "Hyper-Realistic",
            Self::Cinematic => "Cinematic",
            Self::Aesthetic => "Aesthetic",
            Self::WarmIndonesiaRural => "Warm Indonesia Rural",
            Self::UrbanClean => "Urban Clean",
        }
    }
}

impl std::fmt::Display for VisualStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Sales tone the captions inside each angle should follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tone {
    #[default]
    SoftSell,
    HardSell,
    Storytelling,
    Edukasi,
    Luxury,
    Friendly,
}

impl Tone {
    /// All selectable tones, in display order.
    pub const ALL: &'static [Tone] = &[
        Tone::SoftSell,
        Tone::HardSell,
        Tone::Storytelling,
        Tone::Edukasi,
        Tone::Luxury,
        Tone::Friendly,
    ];

    /// Parse a tone from its label or kebab-case CLI spelling.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace(' ', "-").as_str() {
            "soft-sell" => Some(Self::SoftSell),
            "hard-sell" => Some(Self::HardSell),
            "storytelling" => Some(Self::Storytelling),
            "edukasi" => Some(Self::Edukasi),
            "luxury" => Some(Self::Luxury),
            "friendly" => Some(Self::Friendly),
            _ => None,
        }
    }

    /// The label substituted into the template.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SoftSell => "Soft Sell",
            Self::HardSell => "Hard Sell",
            Self::Storytelling => "Storytelling",
            Self::Edukasi => "Edukasi",
            Self::Luxury => "Luxury",
            Self::Friendly => "Friendly",
        }
    }
}

impl std::fmt::Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Variables for one generation request. Constructed fresh per request and
/// not mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationInputs {
    /// Product page URL to analyze. Must be non-empty.
    pub product_link: String,
    pub ratio: Ratio,
    pub visual_style: VisualStyle,
    pub tone: Tone,
}

impl GenerationInputs {
    /// Build inputs for a product link with the default ratio, style, and tone.
    pub fn new(product_link: impl Into<String>) -> Self {
        Self {
            product_link: product_link.into(),
            ratio: Ratio::default(),
            visual_style: VisualStyle::default(),
            tone: Tone::default(),
        }
    }
}

/// Render the user prompt from the template and the given inputs.
///
/// Each of the four placeholders is replaced literally, first occurrence
/// only, with no escaping of the user-supplied link. Callers must treat the
/// result as plain text for the model, not as executable content.
pub fn render_user_prompt(inputs: &GenerationInputs) -> String {
    USER_PROMPT_TEMPLATE
        .replacen("{{product_link}}", &inputs.product_link, 1)
        .replacen("{{visual_style}}", inputs.visual_style.as_str(), 1)
        .replacen("{{ratio}}", inputs.ratio.as_str(), 1)
        .replacen("{{tone}}", inputs.tone.as_str(), 1)
}
