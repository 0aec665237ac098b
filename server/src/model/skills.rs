/// Number of trainable skills.
pub const SKILL_COUNT: usize = 21;

pub const ATTACK: usize = 0;
pub const DEFENCE: usize = 1;
pub const STRENGTH: usize = 2;
pub const HITPOINTS: usize = 3;

pub const MAX_EXPERIENCE: f64 = 200_000_000.0;
pub const MAX_LEVEL: u8 = 99;

pub const SKILL_NAMES: [&str; SKILL_COUNT] = [
    "Attack", "Defence", "Strength", "Hitpoints", "Range", "Prayer", "Magic", "Cooking",
    "Woodcutting", "Fletching", "Fishing", "Firemaking", "Crafting", "Smithing", "Mining",
    "Herblore", "Agility", "Thieving", "Slayer", "Farming", "Runecrafting",
];

/// Experience needed for `level`.
pub fn experience_for_level(level: u8) -> f64 {
    let mut points = 0.0;
    for lvl in 1..level.max(1) {
        let lvl = f64::from(lvl);
        points += (lvl + 300.0 * 2f64.powf(lvl / 7.0)).floor();
    }
    (points / 4.0).floor()
}

/// Highest level reached with `experience`, capped at [`MAX_LEVEL`].
pub fn level_for_experience(experience: f64) -> u8 {
    let mut points = 0.0;
    for lvl in 1..MAX_LEVEL {
        let l = f64::from(lvl);
        points += (l + 300.0 * 2f64.powf(l / 7.0)).floor();
        if (points / 4.0).floor() > experience {
            return lvl;
        }
    }
    MAX_LEVEL
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Skill {
    pub level: u8,
    pub experience: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Skills {
    skills: [Skill; SKILL_COUNT],
}

impl Skills {
    pub fn new() -> Self {
        let mut skills = [Skill {
            level: 1,
            experience: 0.0,
        }; SKILL_COUNT];
        skills[HITPOINTS] = Skill {
            level: 10,
            experience: experience_for_level(10),
        };
        Self { skills }
    }

    pub fn get(&self, skill: usize) -> Option<&Skill> {
        self.skills.get(skill)
    }

    pub fn level(&self, skill: usize) -> u8 {
        self.skills.get(skill).map_or(0, |s| s.level)
    }

    pub fn experience(&self, skill: usize) -> f64 {
        self.skills.get(skill).map_or(0.0, |s| s.experience)
    }

    /// Level implied by experience, ignoring temporary boosts or drains.
    pub fn level_for_experience(&self, skill: usize) -> u8 {
        level_for_experience(self.experience(skill))
    }

    pub fn set_level(&mut self, skill: usize, level: u8) -> bool {
        match self.skills.get_mut(skill) {
            Some(s) => {
                s.level = level;
                true
            }
            None => false,
        }
    }

    /// Adds experience, raising the current level if it went up. Returns
    /// the number of levels gained, or `None` for an unknown skill.
    pub fn add_experience(&mut self, skill: usize, amount: f64) -> Option<u8> {
        let old = self.level_for_experience(skill);
        let s = self.skills.get_mut(skill)?;
        s.experience = (s.experience + amount.max(0.0)).min(MAX_EXPERIENCE);
        let new = level_for_experience(s.experience);
        let gained = new - old;
        s.level = s.level.saturating_add(gained);
        Some(gained)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Skill)> {
        self.skills.iter().enumerate()
    }

    /// Combat level from the first seven skills.
    pub fn combat_level(&self) -> u8 {
        let lvl = |i| f64::from(self.level_for_experience(i));
        let base = (lvl(DEFENCE) + lvl(HITPOINTS) + (lvl(5) / 2.0).floor()) * 0.25;
        let melee = (lvl(ATTACK) + lvl(STRENGTH)) * 0.325;
        let range = (lvl(4) * 1.5).floor() * 0.325;
        let magic = (lvl(6) * 1.5).floor() * 0.325;
        (base + melee.max(range).max(magic)).floor() as u8
    }
}

impl Default for Skills {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_thresholds() {
        assert_eq!(experience_for_level(1), 0.0);
        assert_eq!(experience_for_level(2), 83.0);
        assert_eq!(experience_for_level(10), 1154.0);
        assert_eq!(level_for_experience(0.0), 1);
        assert_eq!(level_for_experience(83.0), 2);
        assert_eq!(level_for_experience(1153.0), 9);
        assert_eq!(level_for_experience(1154.0), 10);
        assert_eq!(level_for_experience(MAX_EXPERIENCE), 99);
    }

    #[test]
    fn test_new_skills() {
        let skills = Skills::new();
        assert_eq!(skills.level(ATTACK), 1);
        assert_eq!(skills.level(HITPOINTS), 10);
        assert_eq!(skills.level_for_experience(HITPOINTS), 10);
        assert_eq!(skills.combat_level(), 3);
    }

    #[test]
    fn test_add_experience_levels_up() {
        let mut skills = Skills::new();
        assert_eq!(skills.add_experience(ATTACK, 83.0), Some(1));
        assert_eq!(skills.level(ATTACK), 2);
        assert_eq!(skills.add_experience(ATTACK, 1.0), Some(0));
        assert_eq!(skills.add_experience(99, 1.0), None);
    }

    #[test]
    fn test_experience_is_capped() {
        let mut skills = Skills::new();
        skills.add_experience(ATTACK, MAX_EXPERIENCE * 2.0);
        assert_eq!(skills.experience(ATTACK), MAX_EXPERIENCE);
        assert_eq!(skills.level(ATTACK), 99);
    }
}
