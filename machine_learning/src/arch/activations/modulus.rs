/// The scattering non linearity `|z|^q`.
#[derive(Clone, Copy, Debug)]
pub struct Modulus {
    order: u32,
}

impl Modulus {
    /// Creates a new `Modulus` of order `q`, an order of 0 behaves as 1.
    pub fn new(order: u32) -> Self {
        Self {
            order: order.max(1),
        }
    }

    pub fn f(&self, z: f32) -> f32 {
        z.abs().powi(self.order as i32)
    }

    /// The derivative `q |z|^(q-1) sign(z)`, taken as 0 at the origin.
    pub fn df(&self, z: f32) -> f32 {
        if z == 0. {
            return 0.;
        }

        let q = self.order as i32;
        q as f32 * z.abs().powi(q - 1) * z.signum()
    }
}
