use shared::domain::{GenerationRequest, Preset};

pub const GOLDEN_DICTIONARY: &str = "6X6_250";
/// Two inches.
pub const GOLDEN_SIZE_MM: f64 = 50.8;
const GOLDEN_BORDER_WIDTH: f64 = 2.0;

const DEFAULT_ROWS: i64 = 1;
const DEFAULT_COLS: i64 = 1;
const DEFAULT_START_ID: i64 = 0;
const DEFAULT_SIZE_MM: f64 = 20.0;
const DEFAULT_SPACING_MM: f64 = 5.0;
const DEFAULT_BORDER_WIDTH: f64 = 2.0;

/// Raw values of the advanced form, as typed. Numeric inputs stay text until a
/// request is built so that half-typed values never fail early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormFields {
    pub dictionary: String,
    pub rows: String,
    pub cols: String,
    pub start_id: String,
    pub size_mm: String,
    pub spacing_mm: String,
    pub include_borders: bool,
    pub include_labels: bool,
    pub include_outer_border: bool,
    pub border_width: String,
}

impl Default for FormFields {
    fn default() -> Self {
        Self {
            dictionary: GOLDEN_DICTIONARY.to_string(),
            rows: DEFAULT_ROWS.to_string(),
            cols: DEFAULT_COLS.to_string(),
            start_id: DEFAULT_START_ID.to_string(),
            size_mm: DEFAULT_SIZE_MM.to_string(),
            spacing_mm: DEFAULT_SPACING_MM.to_string(),
            include_borders: true,
            include_labels: true,
            include_outer_border: false,
            border_width: DEFAULT_BORDER_WIDTH.to_string(),
        }
    }
}

impl FormFields {
    pub fn to_request(&self) -> GenerationRequest {
        GenerationRequest {
            dictionary: self.dictionary.trim().to_string(),
            rows: leading_int(&self.rows, DEFAULT_ROWS),
            cols: leading_int(&self.cols, DEFAULT_COLS),
            start_id: leading_int(&self.start_id, DEFAULT_START_ID),
            size_mm: leading_float(&self.size_mm, DEFAULT_SIZE_MM),
            spacing_mm: leading_float(&self.spacing_mm, DEFAULT_SPACING_MM),
            include_borders: self.include_borders,
            include_labels: self.include_labels,
            include_outer_border: self.include_outer_border,
            border_width: leading_float(&self.border_width, DEFAULT_BORDER_WIDTH),
        }
    }

    /// Border settings are not part of a preset and are left as they are.
    pub fn apply_preset(&mut self, preset: &Preset) {
        self.dictionary = preset.dictionary.clone();
        self.rows = preset.rows.to_string();
        self.cols = preset.cols.to_string();
        self.size_mm = preset.size_mm.to_string();
        self.spacing_mm = preset.spacing_mm.to_string();
        self.include_borders = preset.include_borders;
        self.include_labels = preset.include_labels;
    }

    /// Whether the border width input should be shown at all.
    pub fn border_width_visible(&self) -> bool {
        self.include_outer_border
    }
}

/// Integer value of the leading digits, so `"2.5"` is 2 and `"3 rows"` is 3.
/// Text without a leading number yields `default`.
fn leading_int(raw: &str, default: i64) -> i64 {
    let raw = raw.trim_start();
    raw[..numeric_prefix_len(raw, false)]
        .parse()
        .unwrap_or(default)
}

/// Decimal value of the leading number, so `"12.5 mm"` is 12.5.
fn leading_float(raw: &str, default: f64) -> f64 {
    let raw = raw.trim_start();
    raw[..numeric_prefix_len(raw, true)]
        .parse()
        .unwrap_or(default)
}

/// Length of the `[+-]digits[.digits][e[+-]digits]` prefix, or 0 when the
/// text does not start with a digit (after an optional sign and point).
fn numeric_prefix_len(raw: &str, decimal: bool) -> usize {
    let bytes = raw.as_bytes();
    let digits_from = |start: usize| {
        bytes[start..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let mut digits = digits_from(end);
    end += digits;

    if decimal && bytes.get(end) == Some(&b'.') {
        let fraction = digits_from(end + 1);
        if digits + fraction > 0 {
            end += 1 + fraction;
            digits += fraction;
        }
    }
    if digits == 0 {
        return 0;
    }

    if decimal && matches!(bytes.get(end), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(bytes.get(end + 1), Some(b'+' | b'-')));
        let exponent = digits_from(end + 1 + sign);
        if exponent > 0 {
            end += 1 + sign + exponent;
        }
    }
    end
}

/// One-click single marker: a 2" marker with border and label.
pub fn single_marker_request(marker_id: i64) -> GenerationRequest {
    GenerationRequest {
        dictionary: GOLDEN_DICTIONARY.to_string(),
        rows: 1,
        cols: 1,
        start_id: marker_id,
        size_mm: GOLDEN_SIZE_MM,
        spacing_mm: 5.0,
        include_borders: true,
        include_labels: true,
        include_outer_border: true,
        border_width: GOLDEN_BORDER_WIDTH,
    }
}

/// One-click grid: two 2" markers stacked vertically.
pub fn grid_request(start_id: i64) -> GenerationRequest {
    GenerationRequest {
        rows: 2,
        spacing_mm: 10.0,
        ..single_marker_request(start_id)
    }
}
