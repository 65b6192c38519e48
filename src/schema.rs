//! Catalog CSV column names
//!
//! Headers are matched case-insensitively with `_` and spaces treated alike,
//! so `surface_area_disturbed` also matches `Surface Area Disturbed`.

/// Standard-machine catalog
pub mod machines {
    pub const NAME: &str = "name";
    pub const ROTATES: &str = "rotates";
    pub const DEPTH: &str = "depth";
    pub const DEPTH_UOM: &str = "depth_uom";
    pub const SPEED: &str = "speed";
    pub const SPEED_UOM: &str = "speed_uom";
    /// Percent of the working width disturbed (0–100)
    pub const SURFACE_AREA_DISTURBED: &str = "surface_area_disturbed";
    pub const TILLAGE_TYPE_FACTOR: &str = "tillage_type_factor";
    pub const PICTURE: &str = "picture";

    pub const REQUIRED: &[&str] = &[NAME, DEPTH, SPEED, SURFACE_AREA_DISTURBED, TILLAGE_TYPE_FACTOR];
}

/// Custom-machine catalog: machine columns, then tool1_* … tool10_*
pub mod custom_machines {
    pub const NAME: &str = "name";
    pub const SPEED: &str = "speed";
    pub const SPEED_UOM: &str = "speed_uom";
    pub const PICTURE: &str = "picture";
    pub const NOTES: &str = "notes";

    pub const TOOL_NAME: &str = "name";
    pub const TOOL_ROTATES: &str = "rotates";
    pub const TOOL_DEPTH: &str = "depth";
    pub const TOOL_DEPTH_UOM: &str = "depth_uom";
    pub const TOOL_SURFACE_AREA_DISTURBED: &str = "surface_area_disturbed";
    pub const TOOL_TILLAGE_TYPE_FACTOR: &str = "tillage_type_factor";

    pub const TOOL_FIELDS: [&str; 6] = [
        TOOL_NAME,
        TOOL_ROTATES,
        TOOL_DEPTH,
        TOOL_DEPTH_UOM,
        TOOL_SURFACE_AREA_DISTURBED,
        TOOL_TILLAGE_TYPE_FACTOR,
    ];

    pub const REQUIRED: &[&str] = &[NAME, SPEED];

    /// `tool{slot}_{field}` with 1-based slot
    pub fn tool_column(slot: usize, field: &str) -> String {
        format!("tool{slot}_{field}")
    }
}

/// Pesticide product catalog
pub mod products {
    pub const PRODUCT_NAME: &str = "product name";
    pub const PRODUCT_TYPE: &str = "product type";
    pub const APPLICATION_METHOD: &str = "application method";
    pub const AI_EIQ: &str = "AI1 eiq";
    /// Active ingredient concentration, percent
    pub const AI_CONCENTRATION: &str = "AI1concentration";
    pub const SUGGESTED_RATE: &str = "label suggested rate";
    pub const MINIMUM_RATE: &str = "label minimum rate";
    pub const RATE_UOM: &str = "rate UOM";

    pub const REQUIRED: &[&str] = &[PRODUCT_NAME, AI_EIQ, AI_CONCENTRATION, RATE_UOM];
}

/// Normalized form used to match headers: BOM stripped, lowercase, `_` as space
pub fn header_key(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}')
        .to_lowercase()
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_key() {
        assert_eq!(header_key("\u{feff}name"), "name");
        assert_eq!(header_key(" Surface_Area_Disturbed "), "surface area disturbed");
        assert_eq!(header_key("rate UOM"), header_key("rate_uom"));
        assert_eq!(custom_machines::tool_column(3, custom_machines::TOOL_DEPTH), "tool3_depth");
    }
}
