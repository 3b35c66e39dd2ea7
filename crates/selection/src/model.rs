use firstrun_types::AppDescriptor;

/// One incremental change to the ordered view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    Inserted { index: usize, count: usize },
    Changed { index: usize, count: usize },
    Removed { index: usize, count: usize },
    /// An update changed an item's sort position
    Moved { from: usize, to: usize },
}

/// Apps ordered by display name, unique by package id
#[derive(Debug, Clone, Default)]
pub struct SelectionModel {
    items: Vec<AppDescriptor>,
}

impl SelectionModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or merge an app.
    ///
    /// An app whose package id is already present replaces the stored one
    /// only when its visible content differs; identical re-inserts report
    /// nothing.
    pub fn insert(&mut self, item: AppDescriptor) -> Vec<SelectionChange> {
        let Some(existing) = self.position_of(&item.package_id) else {
            let index = self.insertion_point(&item);
            self.items.insert(index, item);
            return vec![SelectionChange::Inserted { index, count: 1 }];
        };

        if self.items[existing].same_content(&item) {
            return Vec::new();
        }

        self.items.remove(existing);
        let index = self.insertion_point(&item);
        self.items.insert(index, item);

        let mut changes = Vec::with_capacity(2);
        if index != existing {
            changes.push(SelectionChange::Moved {
                from: existing,
                to: index,
            });
        }
        changes.push(SelectionChange::Changed { index, count: 1 });
        changes
    }

    /// Insert many apps, collecting the changes in order
    pub fn insert_all<I>(&mut self, items: I) -> Vec<SelectionChange>
    where
        I: IntoIterator<Item = AppDescriptor>,
    {
        items.into_iter().flat_map(|item| self.insert(item)).collect()
    }

    /// Remove an app by package id
    pub fn remove(&mut self, package_id: &str) -> Option<(AppDescriptor, SelectionChange)> {
        let index = self.position_of(package_id)?;
        let item = self.items.remove(index);
        Some((item, SelectionChange::Removed { index, count: 1 }))
    }

    /// Set one app's checked flag; reports a change only if it flipped
    pub fn set_checked(&mut self, package_id: &str, checked: bool) -> Option<SelectionChange> {
        let index = self.position_of(package_id)?;
        let item = &mut self.items[index];
        if item.checked == checked {
            return None;
        }
        item.checked = checked;
        Some(SelectionChange::Changed { index, count: 1 })
    }

    /// Set every app's checked flag, one change per app that flipped
    pub fn set_all_checked(&mut self, checked: bool) -> Vec<SelectionChange> {
        self.items
            .iter_mut()
            .enumerate()
            .filter(|(_, item)| item.checked != checked)
            .map(|(index, item)| {
                item.checked = checked;
                SelectionChange::Changed { index, count: 1 }
            })
            .collect()
    }

    /// Remove everything
    pub fn clear(&mut self) -> Option<SelectionChange> {
        if self.items.is_empty() {
            return None;
        }
        let count = self.items.len();
        self.items.clear();
        Some(SelectionChange::Removed { index: 0, count })
    }

    /// Archive references of checked apps, in model order
    #[must_use]
    pub fn selected_archive_refs(&self) -> Vec<String> {
        self.checked().map(|item| item.archive_ref.clone()).collect()
    }

    /// Package ids of checked apps, in model order
    #[must_use]
    pub fn selected_package_ids(&self) -> Vec<String> {
        self.checked().map(|item| item.package_id.clone()).collect()
    }

    fn checked(&self) -> impl Iterator<Item = &AppDescriptor> {
        self.items.iter().filter(|item| item.checked)
    }

    #[must_use]
    pub fn items(&self) -> &[AppDescriptor] {
        &self.items
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&AppDescriptor> {
        self.items.get(index)
    }

    #[must_use]
    pub fn find(&self, package_id: &str) -> Option<&AppDescriptor> {
        self.position_of(package_id).map(|index| &self.items[index])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn position_of(&self, package_id: &str) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.package_id == package_id)
    }

    fn insertion_point(&self, item: &AppDescriptor) -> usize {
        self.items
            .partition_point(|existing| existing.display_order(item).is_lt())
    }
}
