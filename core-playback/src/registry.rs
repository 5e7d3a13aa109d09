//! Named player registry.

use crate::error::{PlaybackError, Result};
use crate::player::Player;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Check that `name` only uses letters, digits and `_`.
pub fn validate_player_name(name: &str) -> Result<()> {
    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(PlaybackError::InvalidPlayerName(name.to_string()));
    }
    Ok(())
}

/// The set of players a jukebox controls, keyed by name.
#[derive(Default)]
pub struct PlayerList {
    players: BTreeMap<String, Arc<dyn Player>>,
    default: Option<String>,
}

impl PlayerList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `player` under `name`.
    pub fn add(&mut self, name: impl Into<String>, player: Arc<dyn Player>) -> Result<()> {
        let name = name.into();
        validate_player_name(&name)?;
        if self.players.contains_key(&name) {
            return Err(PlaybackError::DuplicatePlayer(name));
        }
        self.players.insert(name, player);
        Ok(())
    }

    pub fn with_player(mut self, name: impl Into<String>, player: Arc<dyn Player>) -> Result<Self> {
        self.add(name, player)?;
        Ok(self)
    }

    /// Prefer `name` as the default player.
    pub fn set_default(&mut self, name: impl Into<String>) {
        self.default = Some(name.into());
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Player>> {
        self.players
            .get(name)
            .cloned()
            .ok_or_else(|| PlaybackError::PlayerNotFound(name.to_string()))
    }

    /// Names in ascending order.
    pub fn names(&self) -> Vec<String> {
        self.players.keys().cloned().collect()
    }

    /// The preferred default if it is registered, otherwise the first name.
    pub fn default_name(&self) -> Option<String> {
        self.default
            .as_ref()
            .filter(|name| self.players.contains_key(*name))
            .cloned()
            .or_else(|| self.players.keys().next().cloned())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn Player>)> {
        self.players.iter().map(|(name, player)| (name.as_str(), player))
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

impl fmt::Debug for PlayerList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayerList")
            .field("players", &self.names())
            .field("default", &self.default)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryPlayer;
    use core_library::MemoryLibrary;

    fn player() -> Arc<dyn Player> {
        Arc::new(MemoryPlayer::new(Arc::new(MemoryLibrary::default())))
    }

    #[test]
    fn test_name_validation() {
        assert!(validate_player_name("kitchen").is_ok());
        assert!(validate_player_name("room_2").is_ok());
        assert!(validate_player_name("").is_err());
        assert!(validate_player_name("living room").is_err());
        assert!(validate_player_name("a/b").is_err());
    }

    #[test]
    fn test_add_and_lookup() {
        let mut list = PlayerList::new();
        list.add("zeta", player()).unwrap();
        list.add("alpha", player()).unwrap();

        assert_eq!(list.names(), ["alpha", "zeta"]);
        assert!(list.get("alpha").is_ok());
        assert_eq!(
            list.get("beta").err(),
            Some(PlaybackError::PlayerNotFound("beta".to_string()))
        );
        assert!(matches!(
            list.add("alpha", player()),
            Err(PlaybackError::DuplicatePlayer(_))
        ));
    }

    #[test]
    fn test_default_falls_back_to_first_name() {
        let mut list = PlayerList::new()
            .with_player("kitchen", player())
            .unwrap()
            .with_player("bedroom", player())
            .unwrap();
        assert_eq!(list.default_name().as_deref(), Some("bedroom"));

        list.set_default("kitchen");
        assert_eq!(list.default_name().as_deref(), Some("kitchen"));

        list.set_default("garage");
        assert_eq!(list.default_name().as_deref(), Some("bedroom"));

        assert_eq!(PlayerList::new().default_name(), None);
    }
}
