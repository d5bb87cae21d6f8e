//! Animated mesh-gradient backdrop.
//!
//! Two layers of colour cells fill the window. Each cell blends the layer's
//! palette by inverse distance to a handful of drifting colour points, with
//! Perlin noise warping the lookup. The background knows nothing about the
//! menu; it only reads [`VisualConfig`].
use bevy::{color::ColorToComponents, prelude::*};
use noise::{NoiseFn, Perlin};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

use crate::{
    data::{
        config::{SiteConfig, VisualConfig},
        layout::{MenuLayoutConfig, ZIndexTable},
    },
    systems::{positioning::environment::Viewport, resize::EnvironmentChanged, MenuSystems},
};

pub const GRID_COLUMNS: usize = 32;
pub const GRID_ROWS: usize = 18;
/// Colour points per layer; extra palette entries are ignored.
pub const MAX_COLOR_POINTS: usize = 4;
const WIREFRAME_CELL_FILL: f32 = 0.92;
const NOISE_SEED: u64 = 12345;

pub struct MeshGradientPlugin;
impl Plugin for MeshGradientPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(GradientNoise::seeded(NOISE_SEED))
            .add_systems(Startup, spawn_mesh_gradient)
            .add_systems(
                Update,
                (fit_to_viewport, GradientLayer::animate).after(MenuSystems::Input),
            );
    }
}

#[derive(Resource)]
pub struct GradientNoise {
    pub uniform: Pcg64Mcg,
    pub perlin: Perlin,
}

impl GradientNoise {
    pub fn seeded(seed: u64) -> Self {
        Self {
            uniform: Pcg64Mcg::seed_from_u64(seed),
            perlin: Perlin::new(seed as u32),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Primary,
    Wireframe,
}

/// Parses `#rrggbb` strings. Unreadable entries become opaque black and an
/// empty palette becomes a single black point.
pub fn parse_palette(colors: &[String]) -> Vec<LinearRgba> {
    let mut palette: Vec<LinearRgba> = colors
        .iter()
        .take(MAX_COLOR_POINTS)
        .map(|hex| match Srgba::hex(hex) {
            Ok(color) => color.into(),
            Err(error) => {
                warn!("unreadable gradient colour {hex:?} ({error}); using black");
                LinearRgba::BLACK
            }
        })
        .collect();
    if palette.is_empty() {
        palette.push(LinearRgba::BLACK);
    }
    palette
}

/// Where colour point `index` sits at time `t`, in unit space.
pub fn color_point(index: usize, t: f32) -> Vec2 {
    let i = index as f32;
    let a = i * 0.37;
    let b = 0.6 + (index % 3) as f32 * 0.3;
    let c = 0.8 + ((index + 1) % 4) as f32 * 0.25;
    Vec2::splat(0.5) + 0.5 * Vec2::new((t * b + a).sin(), (t * c + a * 1.5).cos())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Warp {
    pub distortion: f32,
    pub swirl: f32,
}

/// Colour of the cell at `uv` (unit space, origin bottom-left).
pub fn blend(palette: &[LinearRgba], uv: Vec2, t: f32, warp: Warp, noise: &Perlin) -> LinearRgba {
    let radius = (uv - Vec2::splat(0.5)).length().clamp(0.0, 1.0);
    let center = 1.0 - radius;

    let sample = |x: f32, y: f32| noise.get([x as f64, y as f64, t as f64 * 0.5]) as f32;
    let warped = uv
        + warp.distortion
            * center
            * Vec2::new(sample(uv.x * 2.0, uv.y * 2.0), sample(uv.y * 2.0 + 7.0, uv.x * 2.0));

    let angle = 3.0 * warp.swirl * radius;
    let swirled = Vec2::splat(0.5) + Vec2::from_angle(-angle).rotate(warped - Vec2::splat(0.5));

    let mut color = Vec4::ZERO;
    let mut total = 0.0;
    for (index, point) in palette.iter().enumerate() {
        let distance = (swirled - color_point(index, t)).length().powf(3.5);
        let weight = 1.0 / (distance + 1e-3);
        color += point.to_vec4() * weight;
        total += weight;
    }
    LinearRgba::from_vec4(color / total)
}

#[derive(Component, Debug, Clone)]
#[require(Transform, Visibility)]
pub struct GradientLayer {
    pub kind: LayerKind,
    pub palette: Vec<LinearRgba>,
    pub speed: f32,
    pub warp: Warp,
    pub opacity: f32,
    pub time: f32,
}

impl GradientLayer {
    pub fn from_visual(kind: LayerKind, visual: &VisualConfig, phase: f32) -> Self {
        let warp = Warp {
            distortion: visual.gradient_distortion,
            swirl: visual.gradient_swirl,
        };
        match kind {
            LayerKind::Primary => Self {
                kind,
                palette: parse_palette(&visual.primary_colors),
                speed: visual.gradient_speed,
                warp,
                opacity: visual.gradient_opacity,
                time: phase,
            },
            LayerKind::Wireframe => Self {
                kind,
                palette: parse_palette(&visual.secondary_colors),
                speed: visual.wireframe_speed,
                warp,
                opacity: visual.wireframe_opacity,
                time: phase,
            },
        }
    }

    pub fn cell_color(&self, uv: Vec2, noise: &Perlin) -> Color {
        let color = blend(&self.palette, uv, self.time, self.warp, noise);
        Color::from(color.with_alpha(color.alpha * self.opacity))
    }

    fn animate(
        time: Res<Time>,
        noise: Res<GradientNoise>,
        mut layers: Query<(&mut GradientLayer, &Children)>,
        mut cells: Query<(&GradientCell, &mut Sprite)>,
    ) {
        for (mut layer, children) in &mut layers {
            layer.time += time.delta_secs() * layer.speed;
            for child in children.iter() {
                if let Ok((cell, mut sprite)) = cells.get_mut(child) {
                    sprite.color = layer.cell_color(cell.uv, &noise.perlin);
                }
            }
        }
    }
}

/// One tile of a layer. `uv` is the tile centre in unit space.
#[derive(Component, Debug, Clone, Copy)]
pub struct GradientCell {
    pub uv: Vec2,
}

pub fn cell_uv(column: usize, row: usize) -> Vec2 {
    Vec2::new(
        (column as f32 + 0.5) / GRID_COLUMNS as f32,
        (row as f32 + 0.5) / GRID_ROWS as f32,
    )
}

fn spawn_mesh_gradient(
    mut commands: Commands,
    mut noise: ResMut<GradientNoise>,
    site: Option<Res<SiteConfig>>,
    layout: Option<Res<MenuLayoutConfig>>,
    window: Query<&Window>,
) {
    let visual = site.map(|site| site.visual.clone()).unwrap_or_default();
    let z_index = layout.map(|layout| layout.z_index).unwrap_or_default();
    let viewport = window
        .iter()
        .next()
        .map(|window| Viewport::new(window.width(), window.height()))
        .unwrap_or_default();

    for (kind, z, fill) in [
        (LayerKind::Primary, z_index.background, 1.0),
        (LayerKind::Wireframe, z_index.background_overlay, WIREFRAME_CELL_FILL),
    ] {
        let phase = noise.uniform.random_range(0.0..100.0);
        let layer = GradientLayer::from_visual(kind, &visual, phase);
        let cell_size = Vec2::new(
            fill / GRID_COLUMNS as f32,
            fill / GRID_ROWS as f32,
        );

        commands
            .spawn((
                Name::new(match kind {
                    LayerKind::Primary => "mesh_gradient",
                    LayerKind::Wireframe => "mesh_gradient_wireframe",
                }),
                Transform::from_xyz(0.0, 0.0, ZIndexTable::depth(z))
                    .with_scale(Vec3::new(viewport.width, viewport.height, 1.0)),
                layer.clone(),
            ))
            .with_children(|parent| {
                for row in 0..GRID_ROWS {
                    for column in 0..GRID_COLUMNS {
                        let uv = cell_uv(column, row);
                        parent.spawn((
                            GradientCell { uv },
                            Sprite::from_color(layer.cell_color(uv, &noise.perlin), cell_size),
                            Transform::from_translation((uv - Vec2::splat(0.5)).extend(0.0)),
                        ));
                    }
                }
            });
    }
}

fn fit_to_viewport(
    mut changes: MessageReader<EnvironmentChanged>,
    mut layers: Query<&mut Transform, With<GradientLayer>>,
) {
    let Some(EnvironmentChanged { viewport }) = changes.read().last().copied() else {
        return;
    };
    for mut transform in &mut layers {
        transform.scale = Vec3::new(viewport.width, viewport.height, 1.0);
    }
}
