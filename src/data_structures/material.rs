//! Materials: up to four independently optional texture channels.

use std::fmt;

/// One semantic texture channel of a material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MaterialChannel {
    Diffuse,
    Normal,
    Roughness,
    Metallic,
}

impl MaterialChannel {
    /// All channels in slot order.
    pub const ALL: [MaterialChannel; 4] = [
        MaterialChannel::Diffuse,
        MaterialChannel::Normal,
        MaterialChannel::Roughness,
        MaterialChannel::Metallic,
    ];

    /// Texture slot the channel is bound to during traversal.
    pub const fn slot(self) -> u32 {
        match self {
            MaterialChannel::Diffuse => 0,
            MaterialChannel::Normal => 1,
            MaterialChannel::Roughness => 2,
            MaterialChannel::Metallic => 3,
        }
    }

    /// Name of the sampler uniform the channel is bound to.
    pub const fn uniform_name(self) -> &'static str {
        match self {
            MaterialChannel::Diffuse => "uDiffuse",
            MaterialChannel::Normal => "uNormal",
            MaterialChannel::Roughness => "uRoughness",
            MaterialChannel::Metallic => "uMetallic",
        }
    }

    /// Only colour data is stored in sRGB; the other channels hold linear data.
    pub const fn is_srgb(self) -> bool {
        matches!(self, MaterialChannel::Diffuse)
    }
}

impl fmt::Display for MaterialChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MaterialChannel::Diffuse => "diffuse",
            MaterialChannel::Normal => "normal",
            MaterialChannel::Roughness => "roughness",
            MaterialChannel::Metallic => "metallic",
        })
    }
}

/// Resolved material of a mesh unit. Every channel owns its texture exclusively.
#[derive(Debug)]
pub struct Material<T> {
    pub name: String,
    pub diffuse: Option<T>,
    pub normal: Option<T>,
    pub roughness: Option<T>,
    pub metallic: Option<T>,
}

impl<T> Material<T> {
    /// A material with every channel absent.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            diffuse: None,
            normal: None,
            roughness: None,
            metallic: None,
        }
    }

    pub fn channel(&self, channel: MaterialChannel) -> Option<&T> {
        match channel {
            MaterialChannel::Diffuse => self.diffuse.as_ref(),
            MaterialChannel::Normal => self.normal.as_ref(),
            MaterialChannel::Roughness => self.roughness.as_ref(),
            MaterialChannel::Metallic => self.metallic.as_ref(),
        }
    }

    pub fn set_channel(&mut self, channel: MaterialChannel, texture: Option<T>) {
        match channel {
            MaterialChannel::Diffuse => self.diffuse = texture,
            MaterialChannel::Normal => self.normal = texture,
            MaterialChannel::Roughness => self.roughness = texture,
            MaterialChannel::Metallic => self.metallic = texture,
        }
    }

    /// Present channels in slot order.
    pub fn present(&self) -> impl Iterator<Item = (MaterialChannel, &T)> {
        MaterialChannel::ALL
            .into_iter()
            .filter_map(move |channel| self.channel(channel).map(|t| (channel, t)))
    }
}
