//! Versioned map from logical element names to concrete page locators.
//!
//! The portal's markup churns independently of the automation logic, so the
//! locators live in a single injectable structure instead of inline literals.
//! A locator starting with `//` or `(` is treated as XPath, anything else as
//! a CSS selector.

use crate::errors::RobotError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Placeholder substituted with the entity id when locating the select
/// action inside the results grid (the grid's own ids are dynamic).
pub const ENTITY_PLACEHOLDER: &str = "{entity}";

static DEFAULT_MAP: Lazy<SelectorMap> = Lazy::new(SelectorMap::current);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorMap {
    /// Bumped whenever the portal markup forces a locator change.
    pub version: u32,
    pub login: LoginSelectors,
    pub entity: EntitySelectors,
    pub upload: UploadSelectors,
    pub status: StatusSelectors,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginSelectors {
    pub username_input: String,
    pub submit_button: String,
    pub error_banner: String,
    /// The virtual keypad keys carrying digit candidates. The clear key is
    /// listed separately and never treated as a candidate.
    pub keypad_keys: Vec<String>,
    pub keypad_clear: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySelectors {
    pub registration_filter: String,
    pub tax_id_filter: String,
    pub search_button: String,
    pub loading_overlay: String,
    /// XPath template for the select action on the row matching the entity;
    /// contains [`ENTITY_PLACEHOLDER`].
    pub row_select_template: String,
}

impl EntitySelectors {
    pub fn row_select_for(&self, entity_id: &str) -> String {
        self.row_select_template.replace(ENTITY_PLACEHOLDER, entity_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSelectors {
    /// Hidden file input the artifact is injected into directly.
    pub file_input: String,
    pub import_button: String,
    /// Option telling the portal the artifact uses point as the decimal
    /// separator, matching the converter's output format.
    pub decimal_point_option: String,
    pub check_digit_option: String,
    pub loading_overlay: String,
    pub result_container: String,
    pub error_detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSelectors {
    pub refresh_button: String,
    pub loading_overlay: String,
    /// Rows of the consultation grid, scanned for the artifact's file name.
    pub rows: String,
}

impl SelectorMap {
    /// The map matching the portal markup this build was calibrated against.
    pub fn current() -> Self {
        Self {
            version: 4,
            login: LoginSelectors {
                username_input: "#txtLogin".into(),
                submit_button: "#btnAcessar".into(),
                error_banner: ".alert-danger".into(),
                keypad_keys: vec![
                    "#btn1".into(),
                    "#btn2".into(),
                    "#btn3".into(),
                    "#btn4".into(),
                    "#btn5".into(),
                ],
                keypad_clear: "#btnLimpar".into(),
            },
            entity: EntitySelectors {
                registration_filter: "#txtCae".into(),
                tax_id_filter: "#TxtCPF".into(),
                search_button: "#imbLocalizar".into(),
                loading_overlay: "#loading".into(),
                row_select_template: format!(
                    "//tr[contains(., '{ENTITY_PLACEHOLDER}')]//input[contains(@id, 'imbSelecionar') and contains(@type, 'image')]"
                ),
            },
            upload: UploadSelectors {
                file_input: "#txtUpload".into(),
                import_button: "#btnImportarArquivo".into(),
                decimal_point_option: "#radSeparadorPonto".into(),
                check_digit_option: "#radDVSim".into(),
                loading_overlay: "#loading".into(),
                result_container: "#divMensagemResultado".into(),
                error_detail: "#lblErro".into(),
            },
            status: StatusSelectors {
                refresh_button: "#btnConsultar".into(),
                loading_overlay: "#loading".into(),
                rows: "#grdImportacoes tr".into(),
            },
        }
    }

    /// Shared default instance.
    pub fn default_map() -> &'static SelectorMap {
        &DEFAULT_MAP
    }

    /// Load a map from a JSON file, for swapping in a new revision without
    /// rebuilding.
    pub fn load(path: &Path) -> Result<Self, RobotError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RobotError::Internal(format!("cannot read selector map {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            RobotError::Internal(format!("malformed selector map {}: {e}", path.display()))
        })
    }
}

impl Default for SelectorMap {
    fn default() -> Self {
        Self::current()
    }
}

/// Whether a locator string should be evaluated as XPath rather than CSS.
pub fn is_xpath(locator: &str) -> bool {
    locator.starts_with("//") || locator.starts_with('(')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_select_substitutes_entity_id() {
        let map = SelectorMap::current();
        let locator = map.entity.row_select_for("173254880116");
        assert!(locator.contains("173254880116"));
        assert!(!locator.contains(ENTITY_PLACEHOLDER));
        assert!(is_xpath(&locator));
    }

    #[test]
    fn clear_key_is_not_a_candidate_key() {
        let map = SelectorMap::current();
        assert!(!map.login.keypad_keys.contains(&map.login.keypad_clear));
    }

    #[test]
    fn map_round_trips_through_json() {
        let map = SelectorMap::current();
        let json = serde_json::to_string_pretty(&map).unwrap();
        let back: SelectorMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn css_locators_are_not_mistaken_for_xpath() {
        assert!(!is_xpath("#txtLogin"));
        assert!(!is_xpath(".alert-danger"));
        assert!(is_xpath("//tr[contains(., '1')]//input"));
    }
}
