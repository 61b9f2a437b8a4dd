use super::{SubjectNode, Taxonomy, TopicNode};

pub const MATH: &str = "Math";
pub const READING: &str = "Reading";
pub const TOTAL: &str = "Total";

impl Taxonomy {
    /// The digital SAT content domains.
    pub fn standard() -> Self {
        Self {
            subjects: vec![math(), reading()],
        }
    }
}

fn math() -> SubjectNode {
    SubjectNode::new(
        MATH,
        vec![
            TopicNode::new(
                "Algebra",
                &[
                    "Linear equations in 1 variable",
                    "Linear equations in 2 variables",
                    "Linear functions",
                    "Systems of 2 linear equations in 2 variables",
                    "Linear inequalities in 1 or 2 variables",
                ],
            ),
            TopicNode::new(
                "Advanced math",
                &[
                    "Equivalent expressions",
                    "Nonlinear equations in 1 variable",
                    "Systems of equations in 2 variables",
                    "Nonlinear functions",
                ],
            ),
            TopicNode::new(
                "Problem solving and data analysis",
                &[
                    "Ratios, rates, proportional relationships, and units",
                    "Percentages",
                    "One-variable data: distributions and measures of center and spread",
                    "Two-variable data: models and scatterplots",
                    "Probability and conditional probability",
                    "Inference from sample statistics and margin of error",
                    "Evaluating statistical claims: observational studies and experiments",
                ],
            ),
            TopicNode::new(
                "Geometry and trigonometry",
                &[
                    "Area and volume formulas",
                    "Lines, angles, and triangles",
                    "Right triangles and trigonometry",
                    "Circles",
                ],
            ),
        ],
    )
}

// Reading strands are not subdivided; each is its own single leaf.
fn reading() -> SubjectNode {
    let strands = [
        "Information and ideas",
        "Craft and structure",
        "Expression of ideas",
        "Standard English conventions",
    ];
    SubjectNode::new(
        READING,
        strands
            .iter()
            .map(|name| TopicNode::new(*name, &[name]))
            .collect(),
    )
}
