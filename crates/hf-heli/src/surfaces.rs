//! Fuselage and aerodynamic surfaces.
//!
//! Each surface is a deterministic function of the local flow. Surfaces
//! switch from a linear lift model to a stalled, circulation-limited one
//! when the normal flow exceeds 30 % of the forward speed.

use crate::loads::{Loads, Station};
use hf_core::{EPS, PI, Real};
use nalgebra::Vector3;

/// Main-rotor wake as seen by the airframe.
#[derive(Clone, Copy, Debug)]
pub struct Wake {
    /// Induced velocity [ft/s]
    pub vi: Real,
    pub station: Station,
    pub radius: Real,
}

/// Flow state shared by all surfaces.
#[derive(Clone, Copy, Debug)]
pub struct LocalFlow {
    /// Body-axis airspeed [ft/s]
    pub uvw_air: Vector3<Real>,
    /// Body rates [rad/s]
    pub pqr: Vector3<Real>,
    pub density: Real,
    pub main_wake: Wake,
    /// Tail-rotor induced velocity [ft/s]
    pub tail_vi: Real,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SurfaceLoads {
    pub loads: Loads,
    /// Power absorbed by drag [ft lbf/s]
    pub power: Real,
}

/// Common interface for airframe aerodynamic elements.
pub trait Surface {
    fn name(&self) -> &'static str;

    fn loads(&self, flow: &LocalFlow) -> SurfaceLoads;

    /// Derived constants as `(field, value)` pairs for the parameter tree.
    fn derived(&self) -> [(&'static str, Real); 2];
}

fn stalled(normal: Real, forward: Real) -> bool {
    normal.abs() > 0.3 * forward.abs()
}

/// Quadratic drag body with a downwash-shifted vertical load.
#[derive(Clone, Debug, PartialEq)]
pub struct Fuselage {
    pub station: Station,
    /// Drag areas [ft^2]
    pub xuu: Real,
    pub yvv: Real,
    pub zww: Real,
    /// Empirical correction of the downwash impingement point
    pub correction: Real,
}

impl Surface for Fuselage {
    fn name(&self) -> &'static str {
        "fuselage"
    }

    fn loads(&self, flow: &LocalFlow) -> SurfaceLoads {
        let uvw = &flow.uvw_air;
        let wake = &flow.main_wake;
        let mut wa = uvw[2] - wake.vi;
        if wa > 0.0 {
            wa += EPS;
        }
        let d_fw = (uvw[0] / (-wa) * (wake.station.h - self.station.h)
            - (self.station.d - wake.station.d))
            * self.correction;

        let q = 0.5 * flow.density;
        let force = Vector3::new(
            q * self.xuu * uvw[0].abs() * uvw[0],
            q * self.yvv * uvw[1].abs() * uvw[1],
            q * self.zww * wa.abs() * wa,
        );
        let moment = Vector3::new(
            force[1] * self.station.h,
            force[2] * d_fw - force[0] * self.station.h,
            0.0,
        );
        let power = -force[0] * uvw[0] - force[1] * uvw[1] - force[2] * wa;

        SurfaceLoads {
            loads: Loads::new(force, moment),
            power,
        }
    }

    fn derived(&self) -> [(&'static str, Real); 2] {
        [("FUS_H", self.station.h), ("FUS_D", self.station.d)]
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HorizontalTail {
    pub station: Station,
    pub zuu: Real,
    pub zuw: Real,
    pub zmax: Real,
}

impl HorizontalTail {
    /// Downwash factor: triangular over one rotor radius behind the disc edge.
    fn downwash_factor(&self, flow: &LocalFlow) -> Real {
        let uvw = &flow.uvw_air;
        let wake = &flow.main_wake;
        let v_dw = (wake.vi - uvw[2]).max(EPS);
        let d_dw = uvw[0] / v_dw * (wake.station.h - self.station.h)
            - (self.station.d - wake.station.d - wake.radius);
        if d_dw > 0.0 && d_dw < wake.radius {
            2.0 * (1.0 - d_dw / wake.radius)
        } else {
            0.0
        }
    }
}

impl Surface for HorizontalTail {
    fn name(&self) -> &'static str {
        "horizontal tail"
    }

    fn loads(&self, flow: &LocalFlow) -> SurfaceLoads {
        let uvw = &flow.uvw_air;
        let eps = self.downwash_factor(flow);
        let wa = uvw[2] - eps * flow.main_wake.vi + self.station.d * flow.pqr[1];
        let q = 0.5 * flow.density;

        let z = if stalled(wa, uvw[0]) {
            let vta = (uvw[0] * uvw[0] + uvw[1] * uvw[1] + wa * wa).sqrt();
            q * self.zmax * vta.abs() * wa
        } else {
            q * (self.zuu * uvw[0].abs() * uvw[0] + self.zuw * uvw[0].abs() * wa)
        };

        SurfaceLoads {
            loads: Loads::new(
                Vector3::new(0.0, 0.0, z),
                Vector3::new(0.0, z * self.station.d, 0.0),
            ),
            power: 0.0,
        }
    }

    fn derived(&self) -> [(&'static str, Real); 2] {
        [("HT_H", self.station.h), ("HT_D", self.station.d)]
    }
}

/// Fin, immersed in the tail-rotor wake.
#[derive(Clone, Debug, PartialEq)]
pub struct VerticalTail {
    pub station: Station,
    pub yuu: Real,
    pub yuv: Real,
    pub ymax: Real,
}

impl Surface for VerticalTail {
    fn name(&self) -> &'static str {
        "vertical tail"
    }

    fn loads(&self, flow: &LocalFlow) -> SurfaceLoads {
        let uvw = &flow.uvw_air;
        let va = uvw[1] + flow.tail_vi - self.station.d * flow.pqr[2];
        let q = 0.5 * flow.density;

        let y = if stalled(va, uvw[0]) {
            let vta = (uvw[0] * uvw[0] + va * va).sqrt();
            q * self.ymax * vta.abs() * va
        } else {
            q * (self.yuu * uvw[0].abs() * uvw[0] + self.yuv * uvw[0].abs() * va)
        };

        SurfaceLoads {
            loads: Loads::new(
                Vector3::new(0.0, y, 0.0),
                Vector3::new(y * self.station.h, 0.0, -y * self.station.d),
            ),
            power: 0.0,
        }
    }

    fn derived(&self) -> [(&'static str, Real); 2] {
        [("VT_H", self.station.h), ("VT_D", self.station.d)]
    }
}

/// Stub wing. A zero `zuw` disables it.
#[derive(Clone, Debug, PartialEq)]
pub struct Wing {
    pub station: Station,
    pub zuu: Real,
    pub zuw: Real,
    pub zmax: Real,
}

impl Surface for Wing {
    fn name(&self) -> &'static str {
        "wing"
    }

    fn loads(&self, flow: &LocalFlow) -> SurfaceLoads {
        if self.zuw == 0.0 {
            return SurfaceLoads::default();
        }
        let uvw = &flow.uvw_air;
        let wa = uvw[2] - flow.main_wake.vi;
        let vta_sq = uvw[0] * uvw[0] + wa * wa;
        let q = 0.5 * flow.density;
        let linear = self.zuu * uvw[0] * uvw[0] + self.zuw * uvw[0] * wa;

        let z = if stalled(wa, uvw[0]) {
            q * self.zmax * vta_sq.sqrt() * wa
        } else {
            q * linear
        };
        let x = -q / PI / vta_sq.max(EPS) * linear * linear;

        SurfaceLoads {
            loads: Loads::new(Vector3::new(x, 0.0, z), Vector3::zeros()),
            power: (x * uvw[0]).abs(),
        }
    }

    fn derived(&self) -> [(&'static str, Real); 2] {
        [("WN_H", self.station.h), ("WN_D", self.station.d)]
    }
}
