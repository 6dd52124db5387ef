//! Shows or updates the search service credentials.

use console::style;

use crate::{Result, config};

/// Values given on the command line; `None` keeps the stored value.
#[derive(Debug, Default)]
pub struct SettingsUpdate {
   pub app_id:          Option<String>,
   pub admin_key:       Option<String>,
   pub search_only_key: Option<String>,
   pub index:           Option<String>,
}

impl SettingsUpdate {
   fn is_empty(&self) -> bool {
      self.app_id.is_none()
         && self.admin_key.is_none()
         && self.search_only_key.is_none()
         && self.index.is_none()
   }
}

pub fn execute(update: SettingsUpdate) -> Result<()> {
   let path = config::config_file_path();
   let mut cfg = config::Config::from_file(path)?;

   if !update.is_empty() {
      let SettingsUpdate { app_id, admin_key, search_only_key, index } = update;
      if let Some(v) = app_id {
         cfg.app_id = v;
      }
      if let Some(v) = admin_key {
         cfg.admin_key = v;
      }
      if let Some(v) = search_only_key {
         cfg.search_only_key = v;
      }
      if let Some(v) = index {
         cfg.index = v;
      }
      cfg.save_to(path)?;
      println!("{} saved {}", style("✓").green(), style(path.display()).dim());
   }

   println!("  app id:          {}", show(&cfg.app_id));
   println!("  admin key:       {}", mask(&cfg.admin_key));
   println!("  search-only key: {}", mask(&cfg.search_only_key));
   println!("  index:           {}", show(&cfg.index));

   if let Err(e) = cfg.adapter_settings() {
      println!();
      println!("{} {}", style("!").yellow(), e);
   }
   Ok(())
}

fn show(value: &str) -> String {
   if value.trim().is_empty() {
      style("(unset)").dim().to_string()
   } else {
      value.to_string()
   }
}

fn mask(value: &str) -> String {
   let value = value.trim();
   if value.is_empty() {
      return style("(unset)").dim().to_string();
   }
   let visible: String = value.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
   format!("****{visible}")
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn keys_are_masked() {
      assert_eq!(mask("abcdef123456"), "****3456");
      assert_eq!(mask("ab"), "****ab");
   }

   #[test]
   fn empty_update_is_detected() {
      assert!(SettingsUpdate::default().is_empty());
      assert!(!SettingsUpdate { index: Some("x".into()), ..Default::default() }.is_empty());
   }
}
