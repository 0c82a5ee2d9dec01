//! Extension-point registry driven by the host application.
//!
//! The dispatch core only ever registers into a [`HookRegistry`]; the host owns
//! the registry and decides when each named hook fires.

use std::collections::HashMap;

use crate::application::request::Viewer;

/// What a callback sees when its hook fires: the viewer and the active output stream.
pub struct HookScope<'a> {
    viewer: Viewer,
    out: &'a mut String,
}

impl<'a> HookScope<'a> {
    pub fn new(viewer: Viewer, out: &'a mut String) -> Self {
        Self { viewer, out }
    }

    pub fn viewer(&self) -> Viewer {
        self.viewer
    }

    pub fn out(&mut self) -> &mut String {
        &mut *self.out
    }

    pub fn write_str(&mut self, text: &str) {
        self.out.push_str(text);
    }
}

pub type HookCallback = Box<dyn Fn(&mut HookScope<'_>) + Send + Sync>;

/// Registration side of the host's extension-point registry.
pub trait HookRegistry: Send {
    /// Queue `callback` for `hook`. Lower priorities run first; equal priorities
    /// run in registration order.
    fn register(&mut self, hook: &str, priority: i32, callback: HookCallback);
}

struct Registration {
    priority: i32,
    callback: HookCallback,
}

/// Priority-ordered multimap of callbacks keyed by hook name.
#[derive(Default)]
pub struct PriorityHookRegistry {
    hooks: HashMap<String, Vec<Registration>>,
}

impl PriorityHookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoke every callback bound to `hook` in order. Returns how many ran.
    pub fn fire(&self, hook: &str, scope: &mut HookScope<'_>) -> usize {
        let Some(registrations) = self.hooks.get(hook) else {
            return 0;
        };
        for registration in registrations {
            (registration.callback)(&mut *scope);
        }
        registrations.len()
    }

    pub fn registered(&self, hook: &str) -> usize {
        self.hooks.get(hook).map_or(0, Vec::len)
    }

    pub fn priorities(&self, hook: &str) -> Vec<i32> {
        self.hooks
            .get(hook)
            .map(|list| list.iter().map(|r| r.priority).collect())
            .unwrap_or_default()
    }

    pub fn total(&self) -> usize {
        self.hooks.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl HookRegistry for PriorityHookRegistry {
    fn register(&mut self, hook: &str, priority: i32, callback: HookCallback) {
        let list = self.hooks.entry(hook.to_string()).or_default();
        let pos = list.partition_point(|existing| existing.priority <= priority);
        list.insert(pos, Registration { priority, callback });
    }
}
