use crate::Identity;
use std::collections::HashMap;
use std::sync::Mutex;

/// Who is online right now. Counted per identity, so one player with
/// three tabs joins the roster once and leaves it when the last tab
/// goes. Locks are never held across an await.
#[derive(Default)]
pub struct Presence {
    online: Mutex<HashMap<Identity, usize>>,
}

impl Presence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count `who` in. True when this took them from offline to online.
    pub fn join(&self, who: &Identity) -> bool {
        let mut online = self.online.lock().expect("presence lock");
        let count = online.entry(who.clone()).or_insert(0);
        *count += 1;
        *count == 1
    }

    /// Count `who` out. True when this took them offline.
    pub fn leave(&self, who: &Identity) -> bool {
        let mut online = self.online.lock().expect("presence lock");
        match online.get_mut(who) {
            Some(count) if *count > 1 => {
                *count -= 1;
                false
            }
            Some(_) => {
                online.remove(who);
                true
            }
            None => false,
        }
    }

    /// Sorted roster of everyone online.
    pub fn roster(&self) -> Vec<Identity> {
        let online = self.online.lock().expect("presence lock");
        let mut roster = online.keys().cloned().collect::<Vec<_>>();
        roster.sort();
        roster
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Identity {
        String::from("alice")
    }

    #[test]
    fn first_join_announces() {
        let presence = Presence::new();
        assert!(presence.join(&alice()));
        assert!(!presence.join(&alice()));
        assert_eq!(presence.roster(), vec![alice()]);
    }

    #[test]
    fn last_leave_retires() {
        let presence = Presence::new();
        presence.join(&alice());
        presence.join(&alice());
        assert!(!presence.leave(&alice()));
        assert!(presence.leave(&alice()));
        assert!(presence.roster().is_empty());
    }

    #[test]
    fn leaving_while_offline_is_quiet() {
        let presence = Presence::new();
        assert!(!presence.leave(&alice()));
    }

    #[test]
    fn roster_is_sorted() {
        let presence = Presence::new();
        presence.join(&String::from("zed"));
        presence.join(&alice());
        assert_eq!(presence.roster(), vec![alice(), String::from("zed")]);
    }
}
