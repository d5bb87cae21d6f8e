//! The navigation state machine: which top-level item is active, which
//! sub-item is active under each item, and whether a step is still
//! settling on either axis.
//!
//! The cursor never tracks pixels. Accepted moves come back as a
//! [`MovePlan`] of per-entity deltas; whoever applies the plan animates
//! from the entities' live transforms and reports each settled entity back
//! through [`NavigationCursor::transition_finished`].
use std::{collections::HashSet, time::Duration};

use bevy::prelude::*;
use smallvec::SmallVec;

use crate::systems::positioning::calculator::NavigationAmounts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Horizontal {
    Left,
    Right,
}

impl Horizontal {
    pub fn sign(self) -> f32 {
        match self {
            Horizontal::Left => -1.0,
            Horizontal::Right => 1.0,
        }
    }
}

/// `Down` advances to the next sub-item, which shifts the column up the
/// screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vertical {
    Up,
    Down,
}

impl Vertical {
    pub fn sign(self) -> f32 {
        match self {
            Vertical::Up => 1.0,
            Vertical::Down => -1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItemData {
    pub menu_item_index: usize,
    pub entity: Entity,
    /// `None` when the item has no sub-item container at all.
    pub sub_menu_item_count: Option<usize>,
    pub active_sub_menu_item_index: usize,
    pub sub_container: Option<Entity>,
    pub sub_items: Vec<Entity>,
}

impl MenuItemData {
    pub fn new(menu_item_index: usize, entity: Entity) -> Self {
        Self {
            menu_item_index,
            entity,
            sub_menu_item_count: None,
            active_sub_menu_item_index: 0,
            sub_container: None,
            sub_items: Vec::new(),
        }
    }

    pub fn with_sub_items(mut self, container: Entity, sub_items: Vec<Entity>) -> Self {
        self.sub_menu_item_count = Some(sub_items.len());
        self.sub_container = Some(container);
        self.sub_items = sub_items;
        self
    }

    pub fn active_sub_item(&self) -> Option<Entity> {
        self.sub_items.get(self.active_sub_menu_item_index).copied()
    }
}

/// Moves the "active" marker from one entity to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerChange {
    pub from: Option<Entity>,
    pub to: Option<Entity>,
}

/// Deltas are in world space (y up).
#[derive(Debug, Clone, PartialEq)]
pub struct MovePlan {
    pub moves: SmallVec<[(Entity, Vec2); 8]>,
    pub marker: MarkerChange,
}

impl MovePlan {
    pub fn delta_for(&self, entity: Entity) -> Option<Vec2> {
        self.moves
            .iter()
            .find(|(moved, _)| *moved == entity)
            .map(|(_, delta)| *delta)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Empty,
    AtBoundary,
    NoSubItems,
    Transitioning,
}

#[derive(Debug, Clone)]
struct TransitionLock {
    waiting: HashSet<Entity>,
    elapsed: Duration,
}

impl TransitionLock {
    fn new(entities: impl IntoIterator<Item = Entity>) -> Option<Self> {
        let waiting: HashSet<Entity> = entities.into_iter().collect();
        (!waiting.is_empty()).then_some(Self {
            waiting,
            elapsed: Duration::ZERO,
        })
    }
}

#[derive(Resource, Debug, Clone)]
pub struct NavigationCursor {
    items: Vec<MenuItemData>,
    active_menu_item_index: usize,
    horizontal: Option<TransitionLock>,
    vertical: Option<TransitionLock>,
    timeout: Duration,
}

impl Default for NavigationCursor {
    fn default() -> Self {
        Self::new(Duration::from_millis(1500))
    }
}

impl NavigationCursor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            items: Vec::new(),
            active_menu_item_index: 0,
            horizontal: None,
            vertical: None,
            timeout,
        }
    }

    /// The item a fresh table starts on: the second when there is more
    /// than one.
    pub fn home_index(len: usize) -> usize {
        if len > 1 {
            1
        } else {
            0
        }
    }

    /// Replaces the item table and starts over: the home item is active,
    /// every sub-index is zero, and both axes are unlocked.
    pub fn rebuild(&mut self, mut items: Vec<MenuItemData>) {
        for item in &mut items {
            item.active_sub_menu_item_index = 0;
        }
        self.active_menu_item_index = Self::home_index(items.len());
        self.items = items;
        self.release_locks();
    }

    /// Drops both axis locks without touching any index. Used when the
    /// entities are snapped into place instead of animated.
    pub fn release_locks(&mut self) {
        self.horizontal = None;
        self.vertical = None;
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[MenuItemData] {
        &self.items
    }

    pub fn active_menu_item_index(&self) -> usize {
        self.active_menu_item_index
    }

    pub fn active_item(&self) -> Option<&MenuItemData> {
        self.items.get(self.active_menu_item_index)
    }

    pub fn active_sub_item(&self) -> Option<Entity> {
        self.active_item().and_then(MenuItemData::active_sub_item)
    }

    pub fn is_transitioning_horizontally(&self) -> bool {
        self.horizontal.is_some()
    }

    pub fn is_transitioning_vertically(&self) -> bool {
        self.vertical.is_some()
    }

    pub fn move_horizontal(
        &mut self,
        direction: Horizontal,
        amounts: NavigationAmounts,
    ) -> Result<MovePlan, Rejection> {
        if self.items.is_empty() {
            return Err(Rejection::Empty);
        }

        let index = self.active_menu_item_index;
        let target = match direction {
            Horizontal::Right if index + 1 < self.items.len() => index + 1,
            Horizontal::Left if index > 0 => index - 1,
            _ => {
                debug!("horizontal move {direction:?} rejected at item {index}");
                return Err(Rejection::AtBoundary);
            }
        };

        if self.horizontal.is_some() {
            debug!("horizontal move {direction:?} rejected while transitioning");
            return Err(Rejection::Transitioning);
        }

        self.active_menu_item_index = target;

        let delta = Vec2::new(-direction.sign() * amounts.horizontal, 0.0);
        let moves: SmallVec<[(Entity, Vec2); 8]> =
            self.items.iter().map(|item| (item.entity, delta)).collect();
        self.horizontal = TransitionLock::new(moves.iter().map(|(entity, _)| *entity));

        Ok(MovePlan {
            moves,
            marker: MarkerChange {
                from: Some(self.items[index].entity),
                to: Some(self.items[target].entity),
            },
        })
    }

    /// Steps the active item's sub-items. One sub-item also carries
    /// `vertical_offset`: on `Down` the one that was active, on `Up` the
    /// one above it. Either way it is the sub-item crossing the gap under
    /// the category icon.
    pub fn move_vertical(
        &mut self,
        direction: Vertical,
        amounts: NavigationAmounts,
        vertical_offset: f32,
    ) -> Result<MovePlan, Rejection> {
        let vertical_locked = self.vertical.is_some();
        let Some(item) = self.items.get_mut(self.active_menu_item_index) else {
            return Err(Rejection::Empty);
        };
        let Some(count) = item.sub_menu_item_count else {
            debug!("vertical move rejected: item {} has no sub-items", item.menu_item_index);
            return Err(Rejection::NoSubItems);
        };

        let previous = item.active_sub_menu_item_index;
        let (target, offset_index) = match direction {
            Vertical::Down if previous + 1 < count => (previous + 1, previous),
            Vertical::Up if previous > 0 => (previous - 1, previous - 1),
            _ => {
                debug!("vertical move {direction:?} rejected at sub-item {previous}");
                return Err(Rejection::AtBoundary);
            }
        };

        if vertical_locked {
            debug!("vertical move {direction:?} rejected while transitioning");
            return Err(Rejection::Transitioning);
        }

        item.active_sub_menu_item_index = target;

        let moves: SmallVec<[(Entity, Vec2); 8]> = item
            .sub_items
            .iter()
            .enumerate()
            .map(|(index, entity)| {
                let amount = if index == offset_index {
                    amounts.vertical + vertical_offset
                } else {
                    amounts.vertical
                };
                // Screen space grows downwards; world space grows upwards.
                (*entity, Vec2::new(0.0, -(amount * direction.sign())))
            })
            .collect();
        let marker = MarkerChange {
            from: item.sub_items.get(previous).copied(),
            to: item.sub_items.get(target).copied(),
        };

        self.vertical = TransitionLock::new(moves.iter().map(|(entity, _)| *entity));
        Ok(MovePlan { moves, marker })
    }

    /// Records that `entity` settled. A lock is released once every entity
    /// it waits for has reported.
    pub fn transition_finished(&mut self, entity: Entity) {
        for (axis, lock) in [("horizontal", &mut self.horizontal), ("vertical", &mut self.vertical)] {
            let settled = lock.as_mut().is_some_and(|lock| {
                lock.waiting.remove(&entity);
                lock.waiting.is_empty()
            });
            if settled {
                debug!("{axis} navigation settled");
                *lock = None;
            }
        }
    }

    /// Advances lock timers, force-releasing any lock that has waited
    /// longer than the timeout.
    pub fn tick(&mut self, delta: Duration) {
        let timeout = self.timeout;
        for (axis, lock) in [("horizontal", &mut self.horizontal), ("vertical", &mut self.vertical)] {
            let expired = lock.as_mut().is_some_and(|lock| {
                lock.elapsed += delta;
                lock.elapsed >= timeout
            });
            if expired {
                warn!(
                    "{axis} navigation transition did not settle within {}ms; releasing",
                    timeout.as_millis()
                );
                *lock = None;
            }
        }
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }
}
