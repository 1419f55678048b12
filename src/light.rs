//! Light data and the uniforms it feeds.
//!
//! Lights are plain values. Scenes rebuild them at construction, tweak them in
//! `update`, and push them into shaders with [`DirectionalLight::apply`] /
//! [`PointLight::apply`].

use glam::Vec3;

use crate::shader::Shader;

/// Phong colour terms shared by every light type.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightColor {
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
}

impl LightColor {
    pub fn new(ambient: f32, diffuse: f32, specular: f32) -> Self {
        Self {
            ambient: Vec3::splat(ambient),
            diffuse: Vec3::splat(diffuse),
            specular: Vec3::splat(specular),
        }
    }

    fn apply(&self, shader: &mut Shader, prefix: &str) {
        shader.set_vec3(&format!("{prefix}.ambient"), self.ambient);
        shader.set_vec3(&format!("{prefix}.diffuse"), self.diffuse);
        shader.set_vec3(&format!("{prefix}.specular"), self.specular);
    }
}

/// Sun-style light: parallel rays along `direction`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectionalLight {
    pub direction: Vec3,
    pub color: LightColor,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(-0.2, -1.0, -0.3),
            color: LightColor::new(0.2, 0.4, 0.5),
        }
    }
}

impl DirectionalLight {
    pub fn with_direction(mut self, direction: Vec3) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_color(mut self, color: LightColor) -> Self {
        self.color = color;
        self
    }

    /// Writes `<prefix>.direction`, `.ambient`, `.diffuse`, `.specular`.
    pub fn apply(&self, shader: &mut Shader, prefix: &str) {
        shader.set_vec3(&format!("{prefix}.direction"), self.direction);
        self.color.apply(shader, prefix);
    }
}

/// Distance falloff `1 / (constant + linear·d + quadratic·d²)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Default for Attenuation {
    /// Roughly a 600-unit range.
    fn default() -> Self {
        Self {
            constant: 1.0,
            linear: 0.007,
            quadratic: 0.0002,
        }
    }
}

impl Attenuation {
    pub fn at(&self, distance: f32) -> f32 {
        1.0 / (self.constant + self.linear * distance + self.quadratic * distance * distance)
    }
}

/// Omni light at a position with distance attenuation.
#[derive(Clone, Debug, PartialEq)]
pub struct PointLight {
    /// Names the light in logs and debug output.
    pub id: String,
    pub position: Vec3,
    pub color: LightColor,
    pub attenuation: Attenuation,
}

impl PointLight {
    pub fn new(id: impl Into<String>, position: Vec3) -> Self {
        Self {
            id: id.into(),
            position,
            color: LightColor::new(0.05, 0.8, 1.0),
            attenuation: Attenuation::default(),
        }
    }

    pub fn with_color(mut self, color: LightColor) -> Self {
        self.color = color;
        self
    }

    pub fn with_attenuation(mut self, attenuation: Attenuation) -> Self {
        self.attenuation = attenuation;
        self
    }

    pub fn attenuation_at(&self, point: Vec3) -> f32 {
        self.attenuation.at(self.position.distance(point))
    }

    /// Writes `<prefix>.position`, the colour terms and
    /// `.constant`, `.linear`, `.quadratic`.
    pub fn apply(&self, shader: &mut Shader, prefix: &str) {
        shader.set_vec3(&format!("{prefix}.position"), self.position);
        self.color.apply(shader, prefix);
        shader.set_float(&format!("{prefix}.constant"), self.attenuation.constant);
        shader.set_float(&format!("{prefix}.linear"), self.attenuation.linear);
        shader.set_float(&format!("{prefix}.quadratic"), self.attenuation.quadratic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn directional_defaults() {
        let light = DirectionalLight::default();
        assert_eq!(light.direction, Vec3::new(-0.2, -1.0, -0.3));
        assert_eq!(light.color.ambient, Vec3::splat(0.2));
        assert_eq!(light.color.diffuse, Vec3::splat(0.4));
        assert_eq!(light.color.specular, Vec3::splat(0.5));
    }

    #[test]
    fn attenuation_is_one_at_the_light() {
        let light = PointLight::new("lamp", Vec3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(light.attenuation_at(light.position), 1.0);
    }

    #[test]
    fn attenuation_falls_off_with_distance() {
        let att = Attenuation::default();
        // 1 / (1 + 0.7 + 2)
        assert_relative_eq!(att.at(100.0), 1.0 / 3.7, epsilon = 1e-6);
        assert!(att.at(10.0) > att.at(20.0));
        assert!(att.at(1000.0) < 0.01);
    }

    #[test]
    fn custom_attenuation_is_used() {
        let light = PointLight::new("lamp", Vec3::ZERO).with_attenuation(Attenuation {
            constant: 1.0,
            linear: 0.5,
            quadratic: 0.0,
        });
        assert_relative_eq!(light.attenuation_at(Vec3::new(2.0, 0.0, 0.0)), 0.5);
    }
}
