//! Main and tail rotor models.
//!
//! Both rotors use a uniform-inflow momentum balance with a first-order
//! induced-velocity state. The main rotor adds first-order tip-path-plane
//! flapping (`betas = [longitudinal, lateral]`).

use crate::loads::{Loads, Station};
use hf_core::units::{in_rad_per_s, rpm};
use hf_core::{PI, Real};
use nalgebra::{Vector2, Vector3};

/// Blade geometry and rotor speed shared by both rotors.
#[derive(Clone, Debug, PartialEq)]
pub struct Blade {
    /// Radius [ft]
    pub radius: Real,
    /// Lift-curve slope [1/rad]
    pub lift_slope: Real,
    /// Blade count
    pub count: Real,
    /// Chord [ft]
    pub chord: Real,
    /// Profile drag coefficient
    pub cd0: Real,
    /// Linear twist [rad]
    pub twist: Real,
    /// Rotor speed [rev/min]
    pub rpm: Real,
}

impl Blade {
    pub fn omega(&self) -> Real {
        in_rad_per_s(rpm(self.rpm))
    }

    pub fn tip_speed(&self) -> Real {
        self.radius * self.omega()
    }

    /// Equivalent profile-drag frontal area [ft^2].
    pub fn frontal_area(&self) -> Real {
        self.cd0 * self.radius * self.count * self.chord
    }

    pub fn solidity(&self) -> Real {
        self.count * self.chord / (self.radius * PI)
    }

    /// Thrust per unit density per unit blade-relative inflow.
    pub fn thrust_coefficient(&self) -> Real {
        0.25 * self.tip_speed() * self.radius * self.lift_slope * self.count * self.chord
    }

    /// Equivalent inflow at the blade from the rotor-plane normal velocity.
    fn blade_inflow(&self, plane_velocity: Real, advance_sq: Real, pitch: Real) -> Real {
        let v_tip = self.tip_speed();
        plane_velocity
            + 0.66667 * v_tip * (pitch + 0.75 * self.twist)
            + advance_sq / v_tip * (pitch + 0.5 * self.twist)
    }

    /// Induced-velocity derivative of the momentum balance.
    fn inflow_rate(&self, thrust: Real, density: Real, vi: Real, advance_sq: Real, plane_velocity: Real) -> Real {
        let r = self.radius;
        let through = (advance_sq + (plane_velocity - vi).powi(2)).sqrt();
        0.75 * PI / r * (thrust / (2.0 * PI * density * r * r) - vi * through)
    }
}

/// Airflow and control inputs common to both rotors.
#[derive(Clone, Copy, Debug)]
pub struct RotorInput {
    /// Body-axis airspeed [ft/s]
    pub uvw_air: Vector3<Real>,
    /// Body rates [rad/s]
    pub pqr: Vector3<Real>,
    /// Air density [slug/ft^3]
    pub density: Real,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MainRotor {
    pub blade: Blade,
    pub station: Station,
    /// Hinge offset [ft]
    pub hinge_offset: Real,
    /// Forward shaft tilt [rad]
    pub shaft_tilt: Real,
    /// Blade flapping inertia [slug ft^2]
    pub flap_inertia: Real,
    /// Pitch-flap coupling
    pub k1: Real,
    /// Airspeed above which the wake is considered blown back [ft/s]
    pub transition_speed: Real,

    omega: Real,
    tip_speed: Real,
    frontal_area: Real,
    solidity: Real,
    a_sigma: Real,
    gam_om16_dro: Real,
    dl_db1: Real,
    dl_da1_dro: Real,
    coef_thrust: Real,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MainRotorOutput {
    pub loads: Loads,
    pub vi_dot: Real,
    pub betas_dot: Vector2<Real>,
    pub thrust: Real,
    /// Induced plus profile power [ft lbf/s]
    pub power: Real,
}

impl MainRotor {
    pub fn new(
        blade: Blade,
        station: Station,
        hinge_offset: Real,
        shaft_tilt: Real,
        flap_inertia: Real,
        k1: Real,
        transition_speed: Real,
    ) -> Self {
        let omega = blade.omega();
        let tip_speed = blade.tip_speed();
        let r = blade.radius;
        let (a, b, c, e) = (blade.lift_slope, blade.count, blade.chord, hinge_offset);
        let solidity = blade.solidity();

        let gam_om16_dro =
            a * c * r.powi(4) / flap_inertia * omega / 16.0 * (1.0 + 8.0 / 3.0 * e / r);
        let dl_db1 = b / 2.0 * (1.5 * flap_inertia * e / r * omega * omega);
        let dl_da1_dro = 0.5 * a * b * c * r * tip_speed * tip_speed * e / 6.0;

        Self {
            frontal_area: blade.frontal_area(),
            coef_thrust: blade.thrust_coefficient(),
            a_sigma: a * solidity,
            blade,
            station,
            hinge_offset,
            shaft_tilt,
            flap_inertia,
            k1,
            transition_speed,
            omega,
            tip_speed,
            solidity,
            gam_om16_dro,
            dl_db1,
            dl_da1_dro,
        }
    }

    pub fn omega(&self) -> Real {
        self.omega
    }

    pub fn tip_speed(&self) -> Real {
        self.tip_speed
    }

    /// Derived constants as `(field, value)` pairs for the parameter tree.
    pub fn derived(&self) -> [(&'static str, Real); 11] {
        [
            ("MR_H", self.station.h),
            ("MR_D", self.station.d),
            ("MR_OMEGA", self.omega),
            ("MR_V_TIP", self.tip_speed),
            ("MR_FR", self.frontal_area),
            ("MR_SOL", self.solidity),
            ("MR_A_SIGMA", self.a_sigma),
            ("MR_GAM_OM16_DRO", self.gam_om16_dro),
            ("MR_DL_DB1", self.dl_db1),
            ("MR_DL_DA1_DRO", self.dl_da1_dro),
            ("MR_COEF_TH", self.coef_thrust),
        ]
    }

    /// `swash` is `[collective, longitudinal, lateral]` deflection [rad].
    pub fn evaluate(&self, input: &RotorInput, vi: Real, betas: &Vector2<Real>, swash: &[Real; 3]) -> MainRotorOutput {
        let rho = input.density;
        let uvw = &input.uvw_air;
        let pqr = &input.pqr;
        let [coll, lon, lat] = *swash;
        let (omega, v_tip, r) = (self.omega, self.tip_speed, self.blade.radius);

        let gam_om16 = rho * self.gam_om16_dro;
        let kc = 0.75 * omega * self.hinge_offset / r / gam_om16 + self.k1;
        let itb2_om = omega / (1.0 + (omega / gam_om16).powi(2));
        let itb = itb2_om * omega / gam_om16;
        let dl_da1 = rho * self.dl_da1_dro;

        let advance_sq = uvw[0] * uvw[0] + uvw[1] * uvw[1];
        let wr = uvw[2] + (betas[0] - self.shaft_tilt) * uvw[0] - betas[1] * uvw[1];
        let wb = self.blade.blade_inflow(wr, advance_sq, coll);

        let thrust = (wb - vi) * rho * self.coef_thrust;
        let vi_dot = self.blade.inflow_rate(thrust, rho, vi, advance_sq, wr);

        let induced_power = thrust * (vi - wr);
        let profile_power =
            0.5 * rho * (self.frontal_area / 4.0) * v_tip * (v_tip * v_tip + 3.0 * advance_sq);
        let power = induced_power + profile_power;

        let ct = (thrust / (rho * PI * r * r * v_tip * v_tip)).max(0.0);
        let db1dv = 2.0 / v_tip * (8.0 * ct / self.a_sigma + (0.5 * ct).sqrt());
        let da1du = -db1dv;

        let wake = if uvw[0].abs() > self.transition_speed { 1.0 } else { 0.0 };
        let a_sum = betas[1] - lat + kc * betas[0] + db1dv * uvw[1] * (1.0 + wake);
        let b_sum = betas[0] + lon - kc * betas[1] + da1du * uvw[0] * (1.0 + 2.0 * wake);
        let betas_dot = Vector2::new(
            -itb * b_sum - itb2_om * a_sum - pqr[1],
            -itb * a_sum + itb2_om * b_sum - pqr[0],
        );

        let force = Vector3::new(
            -thrust * (betas[0] - self.shaft_tilt),
            thrust * betas[1],
            -thrust,
        );
        let (h, d) = (self.station.h, self.station.d);
        let moment = Vector3::new(
            force[1] * h + self.dl_db1 * betas[1] + dl_da1 * (betas[0] + lon - self.k1 * betas[1]),
            force[2] * d - force[0] * h
                + self.dl_db1 * betas[0]
                + dl_da1 * (-betas[1] + lat - self.k1 * betas[0]),
            power / omega,
        );

        MainRotorOutput {
            loads: Loads::new(force, moment),
            vi_dot,
            betas_dot,
            thrust,
            power,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TailRotor {
    pub blade: Blade,
    pub station: Station,

    omega: Real,
    tip_speed: Real,
    frontal_area: Real,
    solidity: Real,
    coef_thrust: Real,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TailRotorOutput {
    pub loads: Loads,
    pub vi_dot: Real,
    pub thrust: Real,
    pub power: Real,
}

/// Tail-rotor inflow runs at half rate to keep the explicit step stable.
const TAIL_INFLOW_RATE_SCALE: Real = 0.5;

impl TailRotor {
    pub fn new(blade: Blade, station: Station) -> Self {
        Self {
            omega: blade.omega(),
            tip_speed: blade.tip_speed(),
            frontal_area: blade.frontal_area(),
            solidity: blade.solidity(),
            coef_thrust: blade.thrust_coefficient(),
            blade,
            station,
        }
    }

    pub fn omega(&self) -> Real {
        self.omega
    }

    pub fn tip_speed(&self) -> Real {
        self.tip_speed
    }

    pub fn derived(&self) -> [(&'static str, Real); 7] {
        [
            ("TR_H", self.station.h),
            ("TR_D", self.station.d),
            ("TR_OMEGA", self.omega),
            ("TR_V_TIP", self.tip_speed),
            ("TR_FR", self.frontal_area),
            ("TR_SOL", self.solidity),
            ("TR_COEF_TH", self.coef_thrust),
        ]
    }

    /// `pitch` is the pedal deflection [rad].
    pub fn evaluate(&self, input: &RotorInput, vi: Real, pitch: Real) -> TailRotorOutput {
        let rho = input.density;
        let uvw = &input.uvw_air;
        let pqr = &input.pqr;
        let (h, d) = (self.station.h, self.station.d);

        let w = uvw[2] + pqr[1] * d;
        let advance_sq = w * w + uvw[0] * uvw[0];
        let vr = -(uvw[1] - pqr[2] * d + pqr[0] * h);
        let vb = self.blade.blade_inflow(vr, advance_sq, pitch);

        let thrust = (vb - vi) * rho * self.coef_thrust;
        let vi_dot =
            TAIL_INFLOW_RATE_SCALE * self.blade.inflow_rate(thrust, rho, vi, advance_sq, vr);
        let power = thrust * (vi - vr);

        let force = Vector3::new(0.0, thrust, 0.0);
        let moment = Vector3::new(thrust * h, 0.0, -thrust * d);

        TailRotorOutput {
            loads: Loads::new(force, moment),
            vi_dot,
            thrust,
            power,
        }
    }
}
