use std::path::Path;

use roster_shared::BotRules;
use tracing::{info, warn};

/// Loads bot rules from a JSON file, falling back to the built-in set when no
/// path is configured or the file cannot be used.
pub fn load_bot_rules(path: Option<&Path>) -> BotRules {
    let Some(path) = path else {
        return BotRules::default();
    };

    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read bot rules; using defaults");
            return BotRules::default();
        }
    };

    match BotRules::from_json(&bytes) {
        Ok(rules) if !rules.is_empty() => {
            info!(path = %path.display(), rules = rules.len(), "loaded bot rules");
            rules
        }
        Ok(_) => {
            warn!(path = %path.display(), "bot rules file has no usable rules; using defaults");
            BotRules::default()
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to parse bot rules; using defaults");
            BotRules::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use roster_shared::{BotRule, BotRules};

    use super::load_bot_rules;

    fn temp_rules_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "roster-rules-{}-{name}.json",
            std::process::id()
        ));
        std::fs::write(&path, contents).expect("write temp rules file");
        path
    }

    #[test]
    fn missing_path_uses_defaults() {
        assert_eq!(load_bot_rules(None), BotRules::default());
        assert_eq!(
            load_bot_rules(Some(&PathBuf::from("/nonexistent/roster/rules.json"))),
            BotRules::default()
        );
    }

    #[test]
    fn rules_file_overrides_defaults() {
        let path = temp_rules_file("override", r#"[{"contains":"carl"},{"suffix":"-bot"}]"#);
        let rules = load_bot_rules(Some(&path));
        let _ = std::fs::remove_file(&path);

        assert_eq!(rules.rules()[0], BotRule::Contains("carl".into()));
        assert!(rules.is_bot_name("Carl-bot"));
        assert!(!rules.is_bot_name("ModBot"));
    }

    #[test]
    fn malformed_or_empty_file_falls_back() {
        let path = temp_rules_file("malformed", "{not json");
        assert_eq!(load_bot_rules(Some(&path)), BotRules::default());
        let _ = std::fs::remove_file(&path);

        let path = temp_rules_file("empty", "[]");
        assert_eq!(load_bot_rules(Some(&path)), BotRules::default());
        let _ = std::fs::remove_file(&path);
    }
}
