use std::collections::HashMap;

use log::debug;

use crate::names::NameIndex;
use crate::schedule::types::{Player, PlayerId};

/// All players of a run, with lookups by id and by name.
///
/// Building the roster resolves every partner wish once, so the scorer
/// only ever compares ids.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    players: Vec<Player>,
    by_id: HashMap<PlayerId, usize>,
    names: NameIndex,
}

impl Roster {
    pub fn new(mut players: Vec<Player>) -> Self {
        let mut names = NameIndex::new();
        let mut by_id = HashMap::new();
        for (position, player) in players.iter().enumerate() {
            names.insert(&player.full_name(), &player.id);
            by_id.insert(player.id.clone(), position);
        }

        for player in &mut players {
            player.partners.clear();
            player.dangling_wishes = 0;
            for wish in &player.wishes {
                match names.resolve(wish) {
                    Some(partner) if *partner != player.id => {
                        player.partners.insert(partner.clone());
                    }
                    _ => {
                        debug!("{}: wish '{}' names no other player", player.id, wish);
                        player.dangling_wishes += 1;
                    }
                }
            }
        }

        Self {
            players,
            by_id,
            names,
        }
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn get(&self, id: &PlayerId) -> Option<&Player> {
        self.by_id.get(id).map(|&position| &self.players[position])
    }

    /// Resolves a free-text name to a player.
    pub fn find_by_name(&self, name: &str) -> Option<&Player> {
        self.names.resolve(name).and_then(|id| self.get(id))
    }

    /// Players for a list of ids, skipping unknown ids.
    pub fn members(&self, ids: &[PlayerId]) -> Vec<&Player> {
        ids.iter().filter_map(|id| self.get(id)).collect()
    }

    /// Wishes across the roster that named nobody.
    pub fn dangling_wishes(&self) -> usize {
        self.players.iter().map(|p| p.dangling_wishes).sum()
    }

    pub fn players_with_wishes(&self) -> usize {
        self.players.iter().filter(|p| p.has_wishes()).count()
    }
}
