use whirl_types::models::TabId;

/// Open tabs in display order, plus the focused one.
///
/// The console tab is created with the registry and can never be removed, so
/// `active` falls back to it whenever the focused channel goes away.
#[derive(Debug, Clone)]
pub struct ChannelRegistry {
    tabs: Vec<TabId>,
    active: Option<TabId>,
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self {
            tabs: vec![TabId::Console],
            active: Some(TabId::Console),
        }
    }

    /// Create the channel tab if it is missing. Returns `true` if it was created.
    pub fn ensure(&mut self, channel: &str) -> bool {
        let id = TabId::channel(channel);
        if self.exists(&id) {
            return false;
        }
        self.tabs.push(id);
        true
    }

    /// Remove a channel tab. Returns `true` if something was removed.
    /// Focus moves to the console when the removed tab was active.
    pub fn remove(&mut self, channel: &str) -> bool {
        let id = TabId::channel(channel);
        let Some(pos) = self.tabs.iter().position(|tab| *tab == id) else {
            return false;
        };
        self.tabs.remove(pos);
        if self.active.as_ref() == Some(&id) {
            self.active = Some(TabId::Console);
        }
        true
    }

    /// Focus an existing tab. Unknown tabs are ignored and `false` is returned.
    pub fn set_active(&mut self, tab: &TabId) -> bool {
        if !self.exists(tab) {
            return false;
        }
        self.active = Some(tab.clone());
        true
    }

    pub fn active_or_none(&self) -> Option<&TabId> {
        self.active.as_ref()
    }

    /// Name of the focused tab when it is a chat channel.
    pub fn active_channel(&self) -> Option<&str> {
        self.active.as_ref().and_then(TabId::channel_name)
    }

    pub fn exists(&self, tab: &TabId) -> bool {
        self.tabs.contains(tab)
    }

    pub fn tabs(&self) -> impl Iterator<Item = &TabId> {
        self.tabs.iter()
    }
}
