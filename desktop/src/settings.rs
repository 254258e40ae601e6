use anyhow::{anyhow, Context, Result};
use common::*;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum MultiplierSetting {
    #[default]
    PedalFeel,
    PowerMatched,
}

/// On-disk form of the gateway configuration. Enumerations use the numeric
/// codes of the configuration portal.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub vehicle: u8,
    pub inverter_upgrade: u8,
    pub multiplier_set: MultiplierSetting,
    pub torque_multiplier_110: Option<f32>,
    pub torque_multiplier_160: Option<f32>,
    pub regen_multiplier: Option<f32>,
    pub regen_tuning: bool,
    pub external_channel: u8,
    pub blacklist: Vec<u32>,
    pub blacklist_extended: Vec<u32>,
    pub translation: bool,
    pub repeat_can: bool,
    pub eco_drive_bit: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let config = GatewayConfig::default();
        Self {
            vehicle: config.vehicle.into(),
            inverter_upgrade: config.inverter_upgrade.into(),
            multiplier_set: MultiplierSetting::default(),
            torque_multiplier_110: None,
            torque_multiplier_160: None,
            regen_multiplier: None,
            regen_tuning: config.torque.regen_tuning,
            external_channel: config.external_channel.into(),
            blacklist: Vec::new(),
            blacklist_extended: Vec::new(),
            translation: config.translation_enabled,
            repeat_can: config.repeat_can,
            eco_drive_bit: config.eco_drive_bit,
        }
    }
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let txt = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&txt).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn to_config(&self) -> Result<GatewayConfig> {
        let vehicle = VehicleProfile::try_from(self.vehicle)
            .map_err(|v| anyhow!("unknown vehicle profile {}", v))?;
        let inverter_upgrade = InverterUpgrade::try_from(self.inverter_upgrade)
            .map_err(|v| anyhow!("unknown inverter upgrade {}", v))?;
        let external_channel = ExternalChannel::try_from(self.external_channel)
            .map_err(|v| anyhow!("external channel must be 0 or 1, got {}", v))?;

        let mut torque = TorqueTuning::for_preset(match self.multiplier_set {
            MultiplierSetting::PedalFeel => MultiplierSet::PedalFeel,
            MultiplierSetting::PowerMatched => MultiplierSet::PowerMatched,
        });
        if let Some(m) = self.torque_multiplier_110 {
            torque.preset_110kw = ScaleFactor::from_f32(m);
        }
        if let Some(m) = self.torque_multiplier_160 {
            torque.preset_160kw = ScaleFactor::from_f32(m);
        }
        if let Some(m) = self.regen_multiplier {
            torque.regen = ScaleFactor::from_f32(m);
        }
        torque.regen_tuning = self.regen_tuning;

        let mut config = GatewayConfig {
            vehicle,
            inverter_upgrade,
            torque,
            external_channel,
            translation_enabled: self.translation,
            repeat_can: self.repeat_can,
            eco_drive_bit: self.eco_drive_bit,
            ..Default::default()
        };
        for id in &self.blacklist {
            config.block(*id, false).map_err(|e| anyhow!("blacklist: {}", e))?;
        }
        for id in &self.blacklist_extended {
            config
                .block(*id, true)
                .map_err(|e| anyhow!("blacklist_extended: {}", e))?;
        }
        config.validate().map_err(|e| anyhow!("{}", e))?;
        Ok(config)
    }
}
