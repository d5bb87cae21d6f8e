pub mod blog;
pub mod schema;
pub mod template;

use bevy::{prelude::*, sprite::Anchor, window::PrimaryWindow};

use crate::{
    data::{config::SiteConfig, layout::MenuLayoutConfig},
    startup::render::MainCamera,
    systems::{
        motion::NavigationTransition,
        navigation::{
            cursor::NavigationCursor,
            input::{pointer_world_position, MenuHitbox},
            ActionType, ActiveMenuItem, ActiveSubMenuItem, MenuAction, MenuActionTriggered,
            MenuItem, MenuRebuilt, NavigationPlugin, SubMenuContainer, SubMenuItem,
        },
        positioning::{
            calculator::{MenuDimensions, NavigationAmounts, MENU_COLUMNS},
            environment::Device,
            init_position_manager,
            manager::PositionManager,
            MenuAnchor,
        },
        resize::EnvironmentChanged,
        MenuSystems,
    },
};
use blog::{BlogPostsLoaded, BLOG_FEED};
use schema::{parse_menu_structure, MenuStructure};

pub const MENU_STRUCTURE_JSON: &str = include_str!("./content/menu_structure.json");

const ITEM_FONT_SIZE: f32 = 22.0;
const SUB_ITEM_FONT_SIZE: f32 = 17.0;
const ITEM_HITBOX_HEIGHT: f32 = 90.0;
const HOVER_ALPHA: f32 = 0.7;

pub struct MenuScenePlugin;
impl Plugin for MenuScenePlugin {
    fn build(&self, app: &mut App) {
        if !app.is_plugin_added::<NavigationPlugin>() {
            app.add_plugins(NavigationPlugin);
        }

        app.add_message::<EnvironmentChanged>()
            .add_message::<BlogPostsLoaded>()
            .add_systems(Startup, (load_menu, spawn_menu_anchor))
            .add_systems(
                PostStartup,
                (spawn_menu.after(init_position_manager), load_blog_posts).chain(),
            )
            .add_systems(
                Update,
                (reload_shortcut, apply_blog_posts).in_set(MenuSystems::Input),
            )
            .add_systems(
                Update,
                relayout_on_metrics_change
                    .after(MenuSystems::Apply)
                    .before(MenuSystems::Motion),
            )
            .add_systems(
                Update,
                (sync_container_visibility, hover_feedback, dispatch_menu_actions)
                    .after(MenuSystems::Apply),
            );
    }
}

/// The structure currently on screen.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct LoadedMenu(pub MenuStructure);

/// Reads the configured menu file, then the compiled-in structure, then the
/// hard-coded fallback. Every failure is logged.
pub fn load_menu_structure(site: &SiteConfig) -> MenuStructure {
    if let Some(path) = &site.menu_file {
        let loaded = std::fs::read_to_string(path)
            .map_err(|error| schema::MenuSchemaError::Io(error.to_string()))
            .and_then(|json| parse_menu_structure(&json, site));
        match loaded {
            Ok(structure) => {
                info!("menu structure loaded from {}", path.display());
                return structure;
            }
            Err(error) => warn!("{}: {error}; using the built-in menu", path.display()),
        }
    }

    match parse_menu_structure(MENU_STRUCTURE_JSON, site) {
        Ok(structure) => structure,
        Err(error) => {
            warn!("built-in menu structure rejected: {error}; using fallback menu");
            MenuStructure::fallback()
        }
    }
}

fn load_menu(mut commands: Commands, site: Option<Res<SiteConfig>>) {
    let site = site.map(|site| site.clone()).unwrap_or_default();
    commands.insert_resource(LoadedMenu(load_menu_structure(&site)));
}

fn spawn_menu_anchor(mut commands: Commands, anchors: Query<(), With<MenuAnchor>>) {
    if anchors.is_empty() {
        commands.spawn((Name::new("menu_anchor"), MenuAnchor));
    }
}

/// Everything about the environment that decides where menu entities sit.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct MenuMetrics {
    pub steps: NavigationAmounts,
    pub vertical_offset: f32,
    pub row_offset: f32,
    pub dimensions: MenuDimensions,
}

impl MenuMetrics {
    pub fn current(manager: Option<&PositionManager>, layout: &MenuLayoutConfig) -> Self {
        match manager {
            Some(manager) => {
                let environment = manager.environment();
                Self {
                    steps: manager.navigation_amounts(),
                    vertical_offset: manager.vertical_offset(),
                    row_offset: layout
                        .mobile_row_offset
                        .for_width(environment.viewport.width),
                    dimensions: layout.menu_dimensions.for_platform(environment.platform),
                }
            }
            None => Self {
                steps: NavigationAmounts::default(),
                vertical_offset: layout.vertical_offsets.for_device(Device::Desktop),
                row_offset: 0.0,
                dimensions: layout.menu_dimensions.for_platform(Device::Desktop),
            },
        }
    }

    /// Items hang left of the anchor, four columns wide.
    pub fn item_translation(&self, index: usize) -> Vec3 {
        let x = -(MENU_COLUMNS - index as f32 - 0.5) * self.steps.horizontal + self.row_offset;
        Vec3::new(x, 0.0, 0.1)
    }

    /// Sub-items stack downwards from the first one, which sits
    /// `vertical_offset` under its item.
    pub fn sub_item_translation(&self, index: usize) -> Vec3 {
        let y = -(self.vertical_offset + index as f32 * self.steps.vertical);
        Vec3::new(0.0, y, 0.1)
    }

    /// Where item `index` rests once the row has stepped from its home
    /// item to `active`.
    pub fn settled_item_translation(&self, index: usize, active: usize, count: usize) -> Vec3 {
        let steps = active as f32 - NavigationCursor::home_index(count) as f32;
        self.item_translation(index) - Vec3::X * steps * self.steps.horizontal
    }

    /// Where sub-item `index` rests while `active` is the active sub-item:
    /// earlier ones stack above the item, the rest hang below the gap.
    pub fn settled_sub_item_translation(&self, index: usize, active: usize) -> Vec3 {
        if index < active {
            Vec3::new(0.0, (active - index) as f32 * self.steps.vertical, 0.1)
        } else {
            self.sub_item_translation(index - active)
        }
    }
}

fn spawn_menu(
    mut commands: Commands,
    menu: Res<LoadedMenu>,
    layout: Res<MenuLayoutConfig>,
    manager: Option<Res<PositionManager>>,
    anchors: Query<Entity, With<MenuAnchor>>,
    mut rebuilt: MessageWriter<MenuRebuilt>,
) {
    let Ok(anchor) = anchors.single() else {
        warn!("menu anchor not found; menu not spawned");
        return;
    };
    let metrics = MenuMetrics::current(manager.as_deref(), &layout);
    populate(&mut commands, anchor, &menu.0, metrics);
    commands.insert_resource(metrics);
    rebuilt.write(MenuRebuilt);
}

fn populate(commands: &mut Commands, anchor: Entity, menu: &MenuStructure, metrics: MenuMetrics) {
    commands.entity(anchor).despawn_related::<Children>();
    commands.entity(anchor).with_children(|anchor| {
        for (index, entry) in menu.menu_items.iter().enumerate() {
            anchor
                .spawn((
                    Name::new(format!("menu_item_{}", entry.id)),
                    MenuItem { index },
                    Text2d::new(entry.title.clone()),
                    TextFont {
                        font_size: ITEM_FONT_SIZE,
                        ..default()
                    },
                    TextColor(Color::WHITE),
                    Anchor::CENTER,
                    MenuHitbox::new(metrics.dimensions.item_width, ITEM_HITBOX_HEIGHT),
                    Transform::from_translation(metrics.item_translation(index)),
                ))
                .with_children(|item| {
                    item.spawn((
                        SubMenuContainer {
                            menu_item_index: index,
                        },
                        Visibility::Hidden,
                    ))
                    .with_children(|container| {
                        for (sub_index, sub_entry) in entry.sub_items.iter().enumerate() {
                            container.spawn((
                                SubMenuItem {
                                    menu_item_index: index,
                                    index: sub_index,
                                },
                                MenuAction {
                                    action_type: sub_entry.action,
                                    target: sub_entry.url.clone(),
                                },
                                Text2d::new(sub_entry.name.clone()),
                                TextFont {
                                    font_size: SUB_ITEM_FONT_SIZE,
                                    ..default()
                                },
                                TextColor(Color::WHITE),
                                Anchor::CENTER,
                                MenuHitbox::new(
                                    metrics.dimensions.sub_item_width,
                                    metrics.steps.vertical,
                                ),
                                Transform::from_translation(
                                    metrics.sub_item_translation(sub_index),
                                ),
                            ));
                        }
                    });
                });
        }
    });
    info!("spawned {} menu items", menu.menu_items.len());
}

fn reload_shortcut(
    mut commands: Commands,
    keys: Res<ButtonInput<KeyCode>>,
    site: Option<Res<SiteConfig>>,
    layout: Res<MenuLayoutConfig>,
    manager: Option<Res<PositionManager>>,
    anchors: Query<Entity, With<MenuAnchor>>,
    mut rebuilt: MessageWriter<MenuRebuilt>,
) {
    if !keys.just_pressed(KeyCode::F5) {
        return;
    }
    let Ok(anchor) = anchors.single() else {
        warn!("menu anchor not found; reload skipped");
        return;
    };
    let site = site.map(|site| site.clone()).unwrap_or_default();
    let structure = load_menu_structure(&site);
    let metrics = MenuMetrics::current(manager.as_deref(), &layout);

    populate(&mut commands, anchor, &structure, metrics);
    commands.insert_resource(LoadedMenu(structure));
    commands.insert_resource(metrics);
    rebuilt.write(MenuRebuilt);
    info!("menu reloaded");
}

/// A device or width change can move the row offset and step sizes. The
/// spawned entities are snapped to the new metrics for the current cursor
/// position, so navigation carries on where it was.
fn relayout_on_metrics_change(
    mut commands: Commands,
    mut changes: MessageReader<EnvironmentChanged>,
    spawned: Option<Res<MenuMetrics>>,
    layout: Res<MenuLayoutConfig>,
    manager: Option<Res<PositionManager>>,
    mut cursor: ResMut<NavigationCursor>,
    mut items: Query<
        (Entity, &MenuItem, &mut Transform, &mut MenuHitbox),
        Without<SubMenuItem>,
    >,
    mut sub_items: Query<
        (Entity, &SubMenuItem, &mut Transform, &mut MenuHitbox),
        Without<MenuItem>,
    >,
) {
    if changes.read().count() == 0 {
        return;
    }
    let Some(spawned) = spawned else {
        return;
    };
    let metrics = MenuMetrics::current(manager.as_deref(), &layout);
    if metrics == *spawned {
        return;
    }

    let active = cursor.active_menu_item_index();
    let count = cursor.len();
    let active_sub = |menu_item_index: usize| {
        cursor
            .items()
            .iter()
            .find(|item| item.menu_item_index == menu_item_index)
            .map_or(0, |item| item.active_sub_menu_item_index)
    };

    for (entity, item, mut transform, mut hitbox) in &mut items {
        commands.entity(entity).try_remove::<NavigationTransition>();
        transform.translation = metrics.settled_item_translation(item.index, active, count);
        *hitbox = MenuHitbox::new(metrics.dimensions.item_width, ITEM_HITBOX_HEIGHT);
    }
    for (entity, sub_item, mut transform, mut hitbox) in &mut sub_items {
        commands.entity(entity).try_remove::<NavigationTransition>();
        transform.translation = metrics
            .settled_sub_item_translation(sub_item.index, active_sub(sub_item.menu_item_index));
        *hitbox = MenuHitbox::new(metrics.dimensions.sub_item_width, metrics.steps.vertical);
    }
    cursor.release_locks();

    debug!("menu metrics changed to {metrics:?}; relaid out at item {active}");
    commands.insert_resource(metrics);
}

/// Reads `<data_dir>/blog` once the menu is on screen.
fn load_blog_posts(site: Option<Res<SiteConfig>>, mut loaded: MessageWriter<BlogPostsLoaded>) {
    let data_dir = match site {
        Some(site) => site.data_dir.clone(),
        None => SiteConfig::default().data_dir,
    };
    let dir = blog::blog_dir(&data_dir);
    let posts = blog::read_posts(&dir);
    if posts.is_empty() {
        return;
    }
    info!("read {} blog posts from {}", posts.len(), dir.display());
    loaded.write(BlogPostsLoaded { posts });
}

/// Fills the blog column and respawns the menu around it. Navigation
/// starts over on the new table.
fn apply_blog_posts(
    mut commands: Commands,
    mut loaded: MessageReader<BlogPostsLoaded>,
    menu: Option<ResMut<LoadedMenu>>,
    metrics: Option<Res<MenuMetrics>>,
    anchors: Query<Entity, With<MenuAnchor>>,
    mut rebuilt: MessageWriter<MenuRebuilt>,
) {
    let Some(batch) = loaded.read().last() else {
        return;
    };
    let (Some(mut menu), Some(metrics)) = (menu, metrics) else {
        return;
    };
    if blog::inject_posts(&mut menu.0, BLOG_FEED, &batch.posts) == 0 {
        debug!("no `{BLOG_FEED}` column; {} posts unused", batch.posts.len());
        return;
    }
    let Ok(anchor) = anchors.single() else {
        warn!("menu anchor not found; blog posts not shown");
        return;
    };

    populate(&mut commands, anchor, &menu.0, *metrics);
    rebuilt.write(MenuRebuilt);
}

fn sync_container_visibility(
    cursor: Res<NavigationCursor>,
    mut containers: Query<(&SubMenuContainer, &mut Visibility)>,
) {
    let active = cursor.active_menu_item_index();
    for (container, mut visibility) in &mut containers {
        let wanted = if container.menu_item_index == active {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        };
        visibility.set_if_neq(wanted);
    }
}

/// Dims whatever inactive entry the pointer is over.
fn hover_feedback(
    window: Query<&Window, With<PrimaryWindow>>,
    camera: Query<(&Camera, &GlobalTransform), With<MainCamera>>,
    mut items: Query<
        (&MenuHitbox, &GlobalTransform, &mut TextColor, Has<ActiveMenuItem>),
        (With<MenuItem>, Without<SubMenuItem>),
    >,
    mut sub_items: Query<
        (
            &MenuHitbox,
            &GlobalTransform,
            &InheritedVisibility,
            &mut TextColor,
            Has<ActiveSubMenuItem>,
        ),
        With<SubMenuItem>,
    >,
) {
    let pointer = pointer_world_position(&window, &camera);
    let hovered = |hitbox: &MenuHitbox, transform: &GlobalTransform| {
        pointer.is_some_and(|point| hitbox.contains(transform, point))
    };

    for (hitbox, transform, mut color, active) in &mut items {
        let alpha = if !active && hovered(hitbox, transform) {
            HOVER_ALPHA
        } else {
            1.0
        };
        set_alpha(&mut color, alpha);
    }
    for (hitbox, transform, visibility, mut color, active) in &mut sub_items {
        let alpha = if visibility.get() && !active && hovered(hitbox, transform) {
            HOVER_ALPHA
        } else {
            1.0
        };
        set_alpha(&mut color, alpha);
    }
}

fn set_alpha(color: &mut Mut<TextColor>, alpha: f32) {
    if color.0.alpha() != alpha {
        color.0.set_alpha(alpha);
    }
}

/// What the default dispatcher does with an activated sub-item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    OpenExternal(String),
    NavigateInternal(String),
    Ignored,
}

pub fn dispatch(action: &MenuActionTriggered) -> Dispatch {
    let target = action.target.trim();
    if target.is_empty() || target == "#" {
        return Dispatch::Ignored;
    }
    match action.action_type {
        ActionType::ExternalLink => Dispatch::OpenExternal(target.to_string()),
        ActionType::InternalLink => Dispatch::NavigateInternal(target.to_string()),
        ActionType::None => Dispatch::Ignored,
    }
}

fn dispatch_menu_actions(mut triggered: MessageReader<MenuActionTriggered>) {
    for action in triggered.read() {
        match dispatch(action) {
            Dispatch::OpenExternal(url) => info!("open external link: {url}"),
            Dispatch::NavigateInternal(path) => info!("navigate to {path}"),
            Dispatch::Ignored => debug!(
                "{} action with target {:?} ignored",
                action.action_type.as_str(),
                action.target
            ),
        }
    }
}
