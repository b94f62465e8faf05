//! Nonlinear single-main-rotor helicopter.

use crate::error::{HeliError, HeliResult};
use crate::loads::Loads;
use crate::params::{HeliParams, REQUIRED};
use crate::rotor::RotorInput;
use crate::surfaces::{LocalFlow, Surface, Wake};
use crate::terrain::Terrain;
use crate::wind::{DrydenStates, draw_noise};
use hf_core::kinematics::{
    euler_rate_matrix, quaternion_dot, quaternion_to_dcm, unit_quaternion_to_euler,
};
use hf_core::{CoreResult, Real, Space, wrap_pi};
use hf_project::{ParamTree, load_yaml_validated, resolve_resource};
use hf_sim::{DynamicModel, EvalMode, Registrar, SimResult};
use nalgebra::{Vector2, Vector3, Vector4};
use rand::RngCore;
use std::path::Path;
use tracing::info;

/// Human-readable label of every observation component, in order.
pub const OBSERVATION_LABELS: [&str; 34] = [
    "POWER",
    "LON_AIR_SPD",
    "LAT_AIR_SPD",
    "DWN_AIR_SPD",
    "LON_SPD",
    "LAT_SPD",
    "DWN_SPD",
    "U_ACC",
    "V_ACC",
    "W_ACC",
    "N_VEL",
    "E_VEL",
    "DES_RATE",
    "ROLL",
    "PITCH",
    "YAW",
    "ROLL_RATE",
    "PITCH_RATE",
    "YAW_RATE",
    "N_POS",
    "E_POS",
    "ALTITUDE",
    "GROUND_ALTITUDE",
    "COLL_ANGLE",
    "LON_ANGLE",
    "LAT_ANGLE",
    "PED_ANGLE",
    "COLLECTIVE",
    "LONGITUDINAL",
    "LATERAL",
    "PEDAL",
    "UWIND",
    "VWIND",
    "WWIND",
];

/// Name of the action sub-vector: collective, longitudinal, lateral, pedal.
pub const ACTION: &str = "swash";

pub const TRIM_RESIDUAL_LEN: usize = 32;

const FT_LBF_PER_S_PER_HP: Real = 550.0;

/// Normalizer of the total-power observation [hp].
const POWER_SCALE: Real = 1260.0;

/// Rate states of the second-order Dryden filters get a wider normalizer.
const DRYDEN_RATE_SCALE: Real = 10.0;

/// Typed mirror of the state space. Also used for its derivative.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HeliState {
    /// Main- and tail-rotor induced velocity [ft/s]
    pub vi_mr: Real,
    pub vi_tr: Real,
    /// Rotor azimuths [rad]
    pub psi_mr: Real,
    pub psi_tr: Real,
    /// Tip-path-plane flapping `[longitudinal, lateral]` [rad]
    pub betas: Vector2<Real>,
    /// Body velocity [ft/s]
    pub uvw: Vector3<Real>,
    /// Body rates [rad/s]
    pub pqr: Vector3<Real>,
    /// Attitude quaternion `[x, y, z, w]`
    pub quat: Vector4<Real>,
    /// North-east-down position [ft]
    pub xyz: Vector3<Real>,
    /// Swashplate deflection [rad]
    pub swash: Vector4<Real>,
    pub dryden: DrydenStates,
}

impl HeliState {
    fn load(space: &Space) -> CoreResult<Self> {
        Ok(Self {
            vi_mr: space.get_value("vimr", 0)?,
            vi_tr: space.get_value("vitr", 0)?,
            psi_mr: space.get_value("psimr", 0)?,
            psi_tr: space.get_value("psitr", 0)?,
            betas: space.vector("betas")?,
            uvw: space.vector("uvw")?,
            pqr: space.vector("pqr")?,
            quat: space.vector("quat")?,
            xyz: space.vector("xyz")?,
            swash: space.vector("swashdef")?,
            dryden: DrydenStates {
                u: space.get_value("uswind", 0)?,
                v: space.vector("vswind")?,
                w: space.vector("wswind")?,
            },
        })
    }

    fn store(&self, space: &mut Space) -> CoreResult<()> {
        space.set("vimr", &[self.vi_mr])?;
        space.set("vitr", &[self.vi_tr])?;
        space.set("psimr", &[self.psi_mr])?;
        space.set("psitr", &[self.psi_tr])?;
        space.set("betas", self.betas.as_slice())?;
        space.set("uvw", self.uvw.as_slice())?;
        space.set("pqr", self.pqr.as_slice())?;
        space.set("quat", self.quat.as_slice())?;
        space.set("xyz", self.xyz.as_slice())?;
        space.set("swashdef", self.swash.as_slice())?;
        space.set("uswind", &[self.dryden.u])?;
        space.set("vswind", self.dryden.v.as_slice())?;
        space.set("wswind", self.dryden.w.as_slice())
    }
}

/// Quantities reported after each evaluation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Observations {
    /// Total power [hp]
    pub total_hp: Real,
    pub uvw_air: Vector3<Real>,
    pub uvw: Vector3<Real>,
    /// Specific force [ft/s^2]
    pub acc: Vector3<Real>,
    pub ned_vel: Vector3<Real>,
    pub euler: Vector3<Real>,
    pub euler_dot: Vector3<Real>,
    pub pqr: Vector3<Real>,
    pub xyz: Vector3<Real>,
    pub ground_altitude: Real,
    pub swash: Vector4<Real>,
    pub swash_rate: Vector4<Real>,
    /// Wind acting on the vehicle, north-east-down [ft/s]
    pub wind: Vector3<Real>,
}

/// Per-component body loads of the last evaluation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LoadBreakdown {
    pub main_rotor: Loads,
    pub tail_rotor: Loads,
    pub fuselage: Loads,
    pub horizontal_tail: Loads,
    pub vertical_tail: Loads,
    pub wing: Loads,
    pub gear: Loads,
    pub gravity: Loads,
}

impl LoadBreakdown {
    pub fn total(&self) -> Loads {
        [
            self.main_rotor,
            self.tail_rotor,
            self.fuselage,
            self.horizontal_tail,
            self.vertical_tail,
            self.wing,
            self.gear,
            self.gravity,
        ]
        .into_iter()
        .sum()
    }
}

pub struct Helicopter {
    tree: ParamTree,
    params: HeliParams,
    terrain: Terrain,

    state: HeliState,
    state_dot: HeliState,
    inputs: Vector4<Real>,
    eta: Vector3<Real>,
    obs: Observations,
    loads: LoadBreakdown,
}

impl Helicopter {
    /// Build from a parsed tree and a terrain.
    pub fn new(mut tree: ParamTree, terrain: Terrain) -> HeliResult<Self> {
        let params = HeliParams::from_tree(&mut tree)?;
        Ok(Self {
            tree,
            params,
            terrain,
            state: HeliState::default(),
            state_dot: HeliState::default(),
            inputs: Vector4::zeros(),
            eta: Vector3::zeros(),
            obs: Observations::default(),
            loads: LoadBreakdown::default(),
        })
    }

    /// Build over level ground at `MIN_GR_ALT`, ignoring the raster paths.
    pub fn with_flat_terrain(mut tree: ParamTree) -> HeliResult<Self> {
        let params = HeliParams::from_tree(&mut tree)?;
        let ext = &params.terrain;
        let terrain = Terrain::flat(ext.ns_max, ext.ew_max, ext.min_alt);
        Self::new(tree, terrain)
    }

    /// Load a vehicle file and its terrain rasters.
    pub fn from_file(path: &Path) -> HeliResult<Self> {
        let mut tree = load_yaml_validated(path, REQUIRED)?;
        let params = HeliParams::from_tree(&mut tree)?;
        let hmap = resolve_resource(path, tree.text("ENV", "HMAP_PATH")?);
        let nmap = resolve_resource(path, tree.text("ENV", "NMAP_PATH")?);
        let ext = &params.terrain;
        let terrain = Terrain::load(&hmap, &nmap, ext.ns_max, ext.ew_max, ext.min_alt, ext.max_alt)?;
        info!(path = %path.display(), "helicopter model loaded");
        Self::new(tree, terrain)
    }

    pub fn params(&self) -> &HeliParams {
        &self.params
    }

    pub fn tree(&self) -> &ParamTree {
        &self.tree
    }

    pub fn terrain(&self) -> &Terrain {
        &self.terrain
    }

    pub fn observations(&self) -> &Observations {
        &self.obs
    }

    pub fn loads(&self) -> &LoadBreakdown {
        &self.loads
    }

    fn evaluate(&mut self, mode: EvalMode) {
        let p = &self.params;
        let s = &self.state;
        let live = !mode.is_trim();

        let earth_to_body = quaternion_to_dcm(&s.quat);
        let body_to_earth = earth_to_body.transpose();
        let euler = unit_quaternion_to_euler(&s.quat);
        let euler_dot = euler_rate_matrix(&euler) * s.pqr;
        let ned_vel = body_to_earth * s.uvw;

        let ground = self.terrain.sample(s.xyz[0], s.xyz[1]);
        let ground_altitude = -s.xyz[2] - ground.height;
        let air = p.atmosphere.at(ground_altitude);
        let wind = p
            .wind
            .evaluate(ground_altitude, &ned_vel, &s.dryden, &self.eta, live);
        let swash_rate = p.swashplate.rates(&self.inputs, &s.swash);

        let uvw_air = s.uvw - earth_to_body * wind.wind;
        let rotor_input = RotorInput {
            uvw_air,
            pqr: s.pqr,
            density: air.density,
        };
        let mr = p.main_rotor.evaluate(
            &rotor_input,
            s.vi_mr,
            &s.betas,
            &[s.swash[0], s.swash[1], s.swash[2]],
        );
        let tr = p.tail_rotor.evaluate(&rotor_input, s.vi_tr, s.swash[3]);

        let flow = LocalFlow {
            uvw_air,
            pqr: s.pqr,
            density: air.density,
            main_wake: Wake {
                vi: s.vi_mr,
                station: p.main_rotor.station,
                radius: p.main_rotor.blade.radius,
            },
            tail_vi: s.vi_tr,
        };
        let fuselage = p.fuselage.loads(&flow);
        let horizontal_tail = p.horizontal_tail.loads(&flow);
        let vertical_tail = p.vertical_tail.loads(&flow);
        let wing = p.wing.loads(&flow);
        let gear = p
            .gear
            .loads(&s.xyz, &earth_to_body, &ned_vel, &self.terrain, live);

        // Climb and fuselage power are drawn through the main-rotor shaft.
        let extra_power = p.weight * (-ned_vel[2]) + fuselage.power;
        let mut main_rotor = mr.loads;
        main_rotor.moment[2] += extra_power / p.main_rotor.omega();
        let total_power = mr.power
            + tr.power
            + extra_power
            + wing.power
            + FT_LBF_PER_S_PER_HP * p.hp_loss;

        let loads = LoadBreakdown {
            main_rotor,
            tail_rotor: tr.loads,
            fuselage: fuselage.loads,
            horizontal_tail: horizontal_tail.loads,
            vertical_tail: vertical_tail.loads,
            wing: wing.loads,
            gear,
            gravity: Loads::new(earth_to_body * Vector3::new(0.0, 0.0, p.weight), Vector3::zeros()),
        };
        let total = loads.total();

        let acc = total.force / p.mass;
        let uvw_dot = acc - s.pqr.cross(&s.uvw);
        let pqr_dot = p.inertia_inv * (total.moment - s.pqr.cross(&(p.inertia * s.pqr)));

        self.state_dot = HeliState {
            vi_mr: mr.vi_dot,
            vi_tr: tr.vi_dot,
            psi_mr: p.main_rotor.omega(),
            psi_tr: p.tail_rotor.omega(),
            betas: mr.betas_dot,
            uvw: uvw_dot,
            pqr: pqr_dot,
            quat: quaternion_dot(&s.quat, &s.pqr),
            xyz: ned_vel,
            swash: swash_rate,
            dryden: wind.derivatives,
        };
        self.obs = Observations {
            total_hp: total_power / FT_LBF_PER_S_PER_HP,
            uvw_air,
            uvw: s.uvw,
            acc,
            ned_vel,
            euler,
            euler_dot,
            pqr: s.pqr,
            xyz: s.xyz,
            ground_altitude,
            swash: s.swash,
            swash_rate,
            wind: wind.wind,
        };
        self.loads = loads;
    }
}

impl DynamicModel for Helicopter {
    fn register_states(&self, reg: &mut Registrar<'_>) -> SimResult<()> {
        let mr = &self.params.main_rotor;
        let tr = &self.params.tail_rotor;
        let position_scale = 200.0 * mr.blade.radius;

        reg.state("vimr", &[40.0], mr.tip_speed())?;
        reg.state("vitr", &[40.0], tr.tip_speed())?;
        reg.state("psimr", &[0.0], 1.0)?;
        reg.state("psitr", &[0.0], 1.0)?;
        reg.state("betas", &[0.0; 2], 1.0)?;
        reg.state("uvw", &[0.0; 3], mr.tip_speed())?;
        reg.state("pqr", &[0.0; 3], mr.omega())?;
        reg.state("quat", &[0.0, 0.0, 0.0, 1.0], 1.0)?;
        reg.state(
            "xyz",
            &[0.0, 0.0, -self.params.terrain.max_alt + 1000.0],
            position_scale,
        )?;
        reg.state("swashdef", &[0.0; 4], 1.0)?;
        reg.state("uswind", &[0.0], 1.0)?;
        reg.state("vswind", &[0.0; 2], 1.0)?;
        reg.state("wswind", &[0.0; 2], 1.0)?;
        reg.state_normalizer("vswind", &[1.0, DRYDEN_RATE_SCALE])?;
        reg.state_normalizer("wswind", &[1.0, DRYDEN_RATE_SCALE])
    }

    fn register_actions(&self, reg: &mut Registrar<'_>) -> SimResult<()> {
        reg.action(ACTION, &[0.0; 4], 1.0)
    }

    fn register_observations(&self, reg: &mut Registrar<'_>) -> SimResult<()> {
        let mr = &self.params.main_rotor;
        let v_tip = mr.tip_speed();
        let omega = mr.omega();
        let position_scale = 200.0 * mr.blade.radius;

        reg.observation("totalhp", &[0.0], POWER_SCALE)?;
        reg.observation("uvwair", &[0.0; 3], v_tip)?;
        reg.observation("uvw", &[0.0; 3], v_tip)?;
        reg.observation("acc", &[0.0; 3], v_tip * omega)?;
        reg.observation("nedvel", &[0.0; 3], v_tip)?;
        reg.observation("eulerangles", &[0.0; 3], 1.0)?;
        reg.observation("pqr", &[0.0; 3], omega)?;
        reg.observation("xyz", &[0.0; 3], position_scale)?;
        reg.observation("gralt", &[0.0], position_scale)?;
        reg.observation("swashdef", &[0.0; 4], 1.0)?;
        reg.observation("swashrate", &[0.0; 4], omega)?;
        reg.observation("wind", &[0.0; 3], 1.0)
    }

    fn observation_count(&self) -> Option<usize> {
        Some(OBSERVATION_LABELS.len())
    }

    fn precompute(&mut self) -> SimResult<()> {
        self.params = HeliParams::from_tree(&mut self.tree)?;
        Ok(())
    }

    fn on_reset(&mut self, rng: &mut dyn RngCore) -> SimResult<()> {
        self.params.wind.randomize_direction(rng);
        Ok(())
    }

    fn pre_step(&mut self, dt: Real, rng: &mut dyn RngCore) {
        self.eta = draw_noise(rng, dt);
    }

    fn post_step(&mut self) {
        let s = &mut self.state;
        if let Some(q) = s.quat.try_normalize(Real::EPSILON) {
            s.quat = q;
        }
        s.psi_mr = wrap_pi(s.psi_mr);
        s.psi_tr = wrap_pi(s.psi_tr);
        s.betas = s.betas.map(wrap_pi);
    }

    fn load_actions(&mut self, action: &Space) -> SimResult<()> {
        self.inputs = action.vector(ACTION)?;
        Ok(())
    }

    fn load_states(&mut self, state: &Space) -> SimResult<()> {
        self.state = HeliState::load(state)?;
        Ok(())
    }

    fn store_actions(&self, action: &mut Space) -> SimResult<()> {
        action.set(ACTION, self.inputs.as_slice())?;
        Ok(())
    }

    fn store_states(&self, state: &mut Space) -> SimResult<()> {
        self.state.store(state)?;
        Ok(())
    }

    fn store_state_dots(&self, state_dot: &mut Space) -> SimResult<()> {
        self.state_dot.store(state_dot)?;
        Ok(())
    }

    fn store_observations(&self, observation: &mut Space) -> SimResult<()> {
        let o = &self.obs;
        observation.set("totalhp", &[o.total_hp])?;
        observation.set("uvwair", o.uvw_air.as_slice())?;
        observation.set("uvw", o.uvw.as_slice())?;
        observation.set("acc", o.acc.as_slice())?;
        observation.set("nedvel", o.ned_vel.as_slice())?;
        observation.set("eulerangles", o.euler.as_slice())?;
        observation.set("pqr", o.pqr.as_slice())?;
        observation.set("xyz", o.xyz.as_slice())?;
        observation.set("gralt", &[o.ground_altitude])?;
        observation.set("swashdef", o.swash.as_slice())?;
        observation.set("swashrate", o.swash_rate.as_slice())?;
        observation.set("wind", o.wind.as_slice())?;
        Ok(())
    }

    fn dynamics(&mut self, mode: EvalMode) -> SimResult<()> {
        self.evaluate(mode);
        Ok(())
    }

    fn trim_residual_len(&self) -> usize {
        TRIM_RESIDUAL_LEN
    }

    fn trim_residual(&self, out: &mut [Real]) -> SimResult<()> {
        if out.len() != TRIM_RESIDUAL_LEN {
            return Err(HeliError::Core(hf_core::CoreError::SizeMismatch {
                what: "trim residual".to_string(),
                expected: TRIM_RESIDUAL_LEN,
                actual: out.len(),
            })
            .into());
        }
        let p = &self.params;
        let t = &p.trim;
        let d = &self.state_dot;
        let s = &self.state;
        let o = &self.obs;

        let omega = p.main_rotor.omega();
        let v_tip = p.main_rotor.tip_speed();
        let tr_scale = p.tail_rotor.tip_speed() * p.tail_rotor.omega();
        let position_scale = 200.0 * p.main_rotor.blade.radius;

        out[0] = d.vi_mr / (v_tip * omega);
        out[1] = d.vi_tr / tr_scale;
        out[2] = d.betas[0] / omega;
        out[3] = d.betas[1] / omega;
        for i in 0..3 {
            out[4 + i] = d.uvw[i] / (v_tip * omega);
            out[7 + i] = d.pqr[i] / (omega * omega);
            out[13 + i] = (o.ned_vel[i] - t.ned_vel[i]) / v_tip;
        }
        out[10] = o.euler_dot[0] / omega;
        out[11] = o.euler_dot[1] / omega;
        out[12] = (o.euler_dot[2] - t.yaw_rate) / omega;
        for i in 0..4 {
            out[16 + i] = d.swash[i] / omega;
        }
        out[20] = s.psi_mr - t.psi_mr;
        out[21] = s.psi_tr - t.psi_tr;
        out[22] = (s.xyz[0] - t.north) / position_scale;
        out[23] = (s.xyz[1] - t.east) / position_scale;
        out[24] = (o.ground_altitude - t.ground_altitude) / position_scale;
        out[25] = wrap_pi(o.euler[2] - t.yaw);
        out[26] = s.quat.norm() - 1.0;
        out[27] = s.dryden.u / v_tip;
        out[28] = s.dryden.v[0] / v_tip;
        out[29] = s.dryden.v[1] / v_tip;
        out[30] = s.dryden.w[0] / v_tip;
        out[31] = s.dryden.w[1] / v_tip;
        Ok(())
    }

    fn parameter(&self, node: &str, field: &str) -> SimResult<Real> {
        self.tree
            .number(node, field)
            .map_err(|e| HeliError::from(e).into())
    }

    fn set_parameter(&mut self, node: &str, field: &str, value: Real) -> SimResult<()> {
        self.tree
            .set_number(node, field, value)
            .map_err(|e| HeliError::from(e).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::hover_tree;

    fn heli() -> Helicopter {
        Helicopter::with_flat_terrain(hover_tree()).unwrap()
    }

    #[test]
    fn labels_cover_every_observation() {
        let h = heli();
        assert_eq!(h.observation_count(), Some(34));
        assert_eq!(OBSERVATION_LABELS[0], "POWER");
        assert_eq!(OBSERVATION_LABELS[33], "WWIND");
    }

    #[test]
    fn level_attitude_feels_weight_down() {
        let mut h = heli();
        h.state.quat = Vector4::new(0.0, 0.0, 0.0, 1.0);
        h.state.xyz = Vector3::new(0.0, 0.0, -200.0);
        h.evaluate(EvalMode::Trim);
        assert_eq!(h.loads.gravity.force, Vector3::new(0.0, 0.0, 5000.0));
        assert!((h.obs.ground_altitude - 200.0).abs() < 1e-12);
        assert!(h.obs.total_hp > 0.0);
    }

    #[test]
    fn trim_mode_has_no_gear_contact() {
        let mut h = heli();
        h.state.quat = Vector4::new(0.0, 0.0, 0.0, 1.0);
        // CG one foot above ground: gear well below the surface
        h.state.xyz = Vector3::new(0.0, 0.0, -1.0);
        h.evaluate(EvalMode::Trim);
        assert_eq!(h.loads.gear, Loads::zero());
        h.evaluate(EvalMode::Step);
        assert!(h.loads.gear.force[2] < 0.0);
    }

    #[test]
    fn post_step_wraps_and_normalizes() {
        let mut h = heli();
        h.state.quat = Vector4::new(0.0, 0.0, 0.0, 2.0);
        h.state.psi_mr = 4.0;
        h.state.betas = Vector2::new(-3.5, 0.1);
        h.post_step();
        assert!((h.state.quat.norm() - 1.0).abs() < 1e-15);
        assert!((h.state.psi_mr - (4.0 - 2.0 * hf_core::PI)).abs() < 1e-12);
        assert!(h.state.betas[0] > 0.0);
        assert_eq!(h.state.betas[1], 0.1);
    }

    #[test]
    fn residual_rejects_wrong_length() {
        let h = heli();
        let mut out = [0.0; 10];
        assert!(h.trim_residual(&mut out).is_err());
    }

    #[test]
    fn parameters_read_through_the_tree() {
        let mut h = heli();
        assert_eq!(h.parameter("HELI", "WT").unwrap(), 5000.0);
        assert!(h.parameter("MR", "MR_OMEGA").unwrap() > 40.0);
        h.set_parameter("HELI", "WT", 5500.0).unwrap();
        h.precompute().unwrap();
        assert!((h.params.mass - 5500.0 / 32.174).abs() < 1e-9);
        assert!(matches!(
            h.parameter("MR", "NOPE"),
            Err(hf_sim::SimError::NotFound { .. })
        ));
    }
}
