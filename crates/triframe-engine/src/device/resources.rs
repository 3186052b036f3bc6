/// Slot table mapping opaque handle ids to backend objects.
///
/// Ids are never reused, so a stale handle cannot alias a newer resource.
#[derive(Debug)]
pub(crate) struct ResourceTable<T> {
    slots: Vec<Option<T>>,
    live: usize,
}

impl<T> Default for ResourceTable<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            live: 0,
        }
    }
}

impl<T> ResourceTable<T> {
    pub fn insert(&mut self, value: T) -> u32 {
        let id = self.slots.len() as u32;
        self.slots.push(Some(value));
        self.live += 1;
        id
    }

    pub fn get(&self, id: u32) -> Option<&T> {
        self.slots.get(id as usize).and_then(Option::as_ref)
    }

    pub fn remove(&mut self, id: u32) -> Option<T> {
        let value = self.slots.get_mut(id as usize).and_then(Option::take);
        if value.is_some() {
            self.live -= 1;
        }
        value
    }

    pub fn live(&self) -> usize {
        self.live
    }

    /// Removes every live entry, oldest first.
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.live = 0;
        self.slots.drain(..).flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removed_ids_are_not_reused() {
        let mut table = ResourceTable::default();
        let a = table.insert("a");
        assert_eq!(table.remove(a), Some("a"));
        let b = table.insert("b");
        assert_ne!(a, b);
        assert_eq!(table.get(a), None);
        assert_eq!(table.get(b), Some(&"b"));
    }

    #[test]
    fn double_remove_returns_none() {
        let mut table = ResourceTable::default();
        let id = table.insert(1u8);
        assert!(table.remove(id).is_some());
        assert!(table.remove(id).is_none());
        assert_eq!(table.live(), 0);
    }

    #[test]
    fn drain_skips_released_slots() {
        let mut table = ResourceTable::default();
        let first = table.insert(1);
        table.insert(2);
        table.remove(first);
        assert_eq!(table.drain().collect::<Vec<_>>(), vec![2]);
        assert_eq!(table.live(), 0);
    }
}
