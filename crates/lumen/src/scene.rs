//! # Sphere Scene
//!
//! A small built-in [`World`]: a pinhole camera, a handful of diffuse
//! spheres, one directional light with hard shadows and a sky gradient.
//! One primary ray per pixel.
//!
//! ```text
//!          light
//!            \        ( )  ( )
//!   eye  ──ray──>   (     )        sky
//!                 ══════════════   ground (a very large sphere)
//! ```

use lumen_core::{World, WorldError};
use lumen_shared::{PixelSample, Region, Rgb};

/// Hits closer than this are self-intersections.
const RAY_EPSILON: f32 = 0.001;

/// Light that reaches a surface with no direct illumination.
const AMBIENT: f32 = 0.15;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Vec3 {
    x: f32,
    y: f32,
    z: f32,
}

impl Vec3 {
    const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    fn normalize(self) -> Self {
        let len = self.length();
        if len > 0.0 {
            self * (1.0 / len)
        } else {
            self
        }
    }
}

impl std::ops::Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::Mul<f32> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// A diffuse sphere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sphere {
    center: Vec3,
    radius: f32,
    albedo: [f32; 3],
}

impl Sphere {
    /// Creates a sphere. `albedo` channels are in `[0, 1]`.
    #[must_use]
    pub const fn new(center: [f32; 3], radius: f32, albedo: [f32; 3]) -> Self {
        Self {
            center: Vec3::new(center[0], center[1], center[2]),
            radius,
            albedo,
        }
    }

    /// Distance along the ray to the nearest hit in front of `origin`.
    fn intersect(&self, origin: Vec3, direction: Vec3) -> Option<f32> {
        let oc = origin - self.center;
        let b = oc.dot(direction);
        let c = oc.dot(oc) - self.radius * self.radius;
        let disc = b * b - c;
        if disc < 0.0 {
            return None;
        }
        let root = disc.sqrt();
        [-b - root, -b + root].into_iter().find(|t| *t > RAY_EPSILON)
    }
}

/// The scene every worker renders.
///
/// Immutable after construction, so it is safe to share or clone.
#[derive(Clone, Debug)]
pub struct SphereScene {
    width: u32,
    height: u32,
    spheres: Vec<Sphere>,
    /// Unit vector pointing at the light.
    light: Vec3,
    eye: Vec3,
    /// `tan(fov / 2)`.
    half_fov: f32,
}

impl SphereScene {
    /// An empty scene for a `width x height` image. Renders sky only.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            spheres: Vec::new(),
            light: Vec3::new(-0.5, 1.0, 0.6).normalize(),
            eye: Vec3::new(0.0, 0.6, 3.5),
            half_fov: 0.5,
        }
    }

    /// Adds a sphere.
    #[must_use]
    pub fn with_sphere(mut self, sphere: Sphere) -> Self {
        self.spheres.push(sphere);
        self
    }

    /// Three spheres on a ground plane.
    #[must_use]
    pub fn demo(width: u32, height: u32) -> Self {
        Self::new(width, height)
            .with_sphere(Sphere::new([0.0, -1000.0, 0.0], 1000.0, [0.55, 0.55, 0.5]))
            .with_sphere(Sphere::new([0.0, 0.8, 0.0], 0.8, [0.9, 0.25, 0.2]))
            .with_sphere(Sphere::new([-1.6, 0.5, 0.4], 0.5, [0.2, 0.5, 0.9]))
            .with_sphere(Sphere::new([1.5, 0.4, 0.7], 0.4, [0.3, 0.85, 0.35]))
    }

    /// Number of spheres.
    #[must_use]
    pub fn sphere_count(&self) -> usize {
        self.spheres.len()
    }

    fn closest_hit(&self, origin: Vec3, direction: Vec3) -> Option<(f32, &Sphere)> {
        self.spheres
            .iter()
            .filter_map(|s| s.intersect(origin, direction).map(|t| (t, s)))
            .min_by(|a, b| a.0.total_cmp(&b.0))
    }

    fn primary_ray(&self, x: u32, y: u32) -> Vec3 {
        let aspect = self.width as f32 / self.height.max(1) as f32;
        let u = ((x as f32 + 0.5) / self.width as f32).mul_add(2.0, -1.0);
        let v = 1.0 - (y as f32 + 0.5) / self.height as f32 * 2.0;
        Vec3::new(u * aspect * self.half_fov, v * self.half_fov, -1.0).normalize()
    }

    fn trace(&self, x: u32, y: u32) -> Rgb {
        let direction = self.primary_ray(x, y);
        let Some((t, sphere)) = self.closest_hit(self.eye, direction) else {
            let k = 0.5 * (direction.y + 1.0);
            return Rgb::from_unit(1.0 - 0.5 * k, 1.0 - 0.3 * k, 1.0);
        };

        let point = self.eye + direction * t;
        let normal = (point - sphere.center).normalize();
        let lambert = normal.dot(self.light).max(0.0);
        let lit = if lambert > 0.0 && self.closest_hit(point, self.light).is_none() {
            lambert
        } else {
            0.0
        };
        let shade = AMBIENT + (1.0 - AMBIENT) * lit;
        let [r, g, b] = sphere.albedo;
        Rgb::from_unit(r * shade, g * shade, b * shade)
    }
}

impl World for SphereScene {
    fn render_region(&self, region: &Region) -> Result<Vec<PixelSample>, WorldError> {
        if region.end.x > self.width || region.end.y > self.height {
            return Err(WorldError::RegionOutOfBounds {
                x0: region.origin.x,
                y0: region.origin.y,
                x1: region.end.x,
                y1: region.end.y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(region
            .points()
            .map(|p| PixelSample::new(p.x, p.y, self.trace(p.x, p.y)))
            .collect())
    }
}
