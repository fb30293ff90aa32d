//! Style presets and accepted output sizes. Both are fixed for the life of
//! the process.

/// A style key that is known to have a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Style {
    key: &'static str,
    prompt: &'static str,
}

/// A `WIDTHxHEIGHT` string from [`SIZES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size(&'static str);

// The upstream is tuned on these exact prompts; keep the wording.
const STYLES: &[Style] = &[
    Style {
        key: "ghibli",
        prompt: "Ubah gambar berikut menjadi seperti style studio ghibli dengan mempertahankan detail dan original gambar.",
    },
    Style {
        key: "pixar",
        prompt: "Ubah tekstur gambar ini agar seperti ilustrasi Pixar, tanpa mengubah bentuk atau susunan objek aslinya.",
    },
    Style {
        key: "simpson",
        prompt: "Ubah tekstur gambar ini agar seperti ilustrasi The Simpson, tanpa mengubah bentuk atau susunan objek aslinya",
    },
];

pub const SIZES: &[&str] = &["1024x1024", "1536x1024", "1024x1536"];

impl Style {
    pub fn lookup(key: &str) -> Option<Style> {
        STYLES.iter().copied().find(|style| style.key == key)
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn prompt(&self) -> &'static str {
        self.prompt
    }
}

impl Size {
    pub fn lookup(value: &str) -> Option<Size> {
        SIZES.iter().copied().find(|size| *size == value).map(Size)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}
