#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// A Butcher tableau parameterising an explicit Runge-Kutta method
///
/// The coefficient matrix is strictly lower triangular, stored as one row per
/// stage. A tableau with embedded weights supports error estimation for
/// adaptive stepping.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct ButcherTableau {
    /// Stage coefficient matrix, row i holding a[i][0..i]
    coefficients: Vec<Vec<f32>>,

    /// Combination weights, one per stage
    weights: Vec<f32>,

    /// Embedded lower-order weights, when the method supports error estimation
    embedded_weights: Option<Vec<f32>>,

    /// Node times, one per stage
    nodes: Vec<f32>,

    /// The order of the method
    order: u32,
}

impl ButcherTableau {
    /// Creates a tableau without embedded weights
    pub fn new(coefficients: Vec<Vec<f32>>, weights: Vec<f32>, nodes: Vec<f32>, order: u32) -> Self {
        let tableau = Self {
            coefficients,
            weights,
            embedded_weights: None,
            nodes,
            order,
        };
        tableau.validate();
        tableau
    }

    /// Creates a tableau with an embedded lower-order pair
    pub fn new_embedded(
        coefficients: Vec<Vec<f32>>,
        weights: Vec<f32>,
        embedded_weights: Vec<f32>,
        nodes: Vec<f32>,
        order: u32,
    ) -> Self {
        let tableau = Self {
            coefficients,
            weights,
            embedded_weights: Some(embedded_weights),
            nodes,
            order,
        };
        tableau.validate();
        tableau
    }

    /// Returns the number of stages
    #[inline]
    pub fn stages(&self) -> usize {
        self.weights.len()
    }

    /// Returns the stage coefficient matrix
    #[inline]
    pub fn coefficients(&self) -> &[Vec<f32>] {
        &self.coefficients
    }

    /// Returns the combination weights
    #[inline]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Returns the embedded weights, if the method has them
    #[inline]
    pub fn embedded_weights(&self) -> Option<&[f32]> {
        self.embedded_weights.as_deref()
    }

    /// Returns the node times
    #[inline]
    pub fn nodes(&self) -> &[f32] {
        &self.nodes
    }

    /// Returns the order of the method
    #[inline]
    pub fn order(&self) -> u32 {
        self.order
    }

    /// Returns true if the tableau supports embedded error estimation
    #[inline]
    pub fn is_embedded(&self) -> bool {
        self.embedded_weights.is_some()
    }

    /// Consistency checks: weights sum to one, row sums match the node times
    fn validate(&self) {
        let stages = self.stages();
        debug_assert_eq!(self.coefficients.len(), stages);
        debug_assert_eq!(self.nodes.len(), stages);
        if let Some(embedded) = &self.embedded_weights {
            debug_assert_eq!(embedded.len(), stages);
            let sum: f32 = embedded.iter().sum();
            debug_assert!((sum - 1.0).abs() < 1.0e-4, "embedded weights sum to {}", sum);
        }

        let sum: f32 = self.weights.iter().sum();
        debug_assert!((sum - 1.0).abs() < 1.0e-4, "weights sum to {}", sum);

        for (i, row) in self.coefficients.iter().enumerate() {
            debug_assert!(row.len() <= i, "coefficient matrix must be strictly lower triangular");
            let row_sum: f32 = row.iter().sum();
            debug_assert!(
                (row_sum - self.nodes[i]).abs() < 1.0e-4,
                "row {} sums to {}, expected node {}",
                i,
                row_sum,
                self.nodes[i]
            );
        }
    }

    /// The explicit Euler method, order 1
    pub fn euler() -> Self {
        Self::new(vec![vec![]], vec![1.0], vec![0.0], 1)
    }

    /// The explicit midpoint method, order 2
    pub fn midpoint() -> Self {
        Self::new(vec![vec![], vec![0.5]], vec![0.0, 1.0], vec![0.0, 0.5], 2)
    }

    /// The classic fourth-order Runge-Kutta method
    pub fn rk4() -> Self {
        Self::new(
            vec![vec![], vec![0.5], vec![0.0, 0.5], vec![0.0, 0.0, 1.0]],
            vec![1.0 / 6.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 6.0],
            vec![0.0, 0.5, 0.5, 1.0],
            4,
        )
    }

    /// The 3/8-rule fourth-order Runge-Kutta method
    pub fn rk38() -> Self {
        Self::new(
            vec![
                vec![],
                vec![1.0 / 3.0],
                vec![-1.0 / 3.0, 1.0],
                vec![1.0, -1.0, 1.0],
            ],
            vec![1.0 / 8.0, 3.0 / 8.0, 3.0 / 8.0, 1.0 / 8.0],
            vec![0.0, 1.0 / 3.0, 2.0 / 3.0, 1.0],
            4,
        )
    }

    /// The Runge-Kutta-Fehlberg 4(5) embedded pair
    pub fn rkf45() -> Self {
        Self::new_embedded(
            vec![
                vec![],
                vec![0.25],
                vec![3.0 / 32.0, 9.0 / 32.0],
                vec![1932.0 / 2197.0, -7200.0 / 2197.0, 7296.0 / 2197.0],
                vec![439.0 / 216.0, -8.0, 3680.0 / 513.0, -845.0 / 4104.0],
                vec![-8.0 / 27.0, 2.0, -3544.0 / 2565.0, 1859.0 / 4104.0, -11.0 / 40.0],
            ],
            vec![
                16.0 / 135.0,
                0.0,
                6656.0 / 12825.0,
                28561.0 / 56430.0,
                -9.0 / 50.0,
                2.0 / 55.0,
            ],
            vec![25.0 / 216.0, 0.0, 1408.0 / 2565.0, 2197.0 / 4104.0, -0.2, 0.0],
            vec![0.0, 0.25, 3.0 / 8.0, 12.0 / 13.0, 1.0, 0.5],
            4,
        )
    }
}
