use crate::position::Position;

/// A short route on the Oschersleben race track, ordered in driving direction.
pub fn get_route() -> Vec<Position> {
    vec![
        Position::new(&52.026649, &11.282535),
        Position::new(&52.026751, &11.282047),
        Position::new(&52.026807, &11.281746),
    ]
}
