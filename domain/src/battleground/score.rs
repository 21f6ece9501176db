use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreType {
    KillingBlows,
    Deaths,
    HonorableKills,
    BonusHonor,
    DamageDone,
    HealingDone,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BattlegroundScore {
    pub killing_blows: u32,
    pub deaths: u32,
    pub honorable_kills: u32,
    pub bonus_honor: u32,
    pub damage_done: u32,
    pub healing_done: u32,
}

impl BattlegroundScore {
    pub fn update(
        &mut self,
        kind: ScoreType,
        value: u32,
    ) {
        let field = match kind {
            ScoreType::KillingBlows => &mut self.killing_blows,
            ScoreType::Deaths => &mut self.deaths,
            ScoreType::HonorableKills => &mut self.honorable_kills,
            ScoreType::BonusHonor => &mut self.bonus_honor,
            ScoreType::DamageDone => &mut self.damage_done,
            ScoreType::HealingDone => &mut self.healing_done,
        };
        *field = field.saturating_add(value);
    }
}

/// Honor worth `kills` honorable kills at `level`.
#[must_use]
pub fn bonus_honor_from_kills(
    kills: u32,
    level: u8,
) -> u32 {
    (f64::from(kills) * f64::from(level) * 1.55).ceil() as u32
}
