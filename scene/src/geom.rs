use serde::Serialize;

/// Placement rectangle of one annotated character, in scene pixels.
///
/// `x_max`/`y_max` are exclusive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x_min: u32,
    pub y_min: u32,
    pub x_max: u32,
    pub y_max: u32,
    pub class_id: u32,
}

impl BoundingBox {
    pub fn at(x: u32, y: u32, width: u32, height: u32, class_id: u32) -> Self {
        Self {
            x_min: x,
            y_min: y,
            x_max: x + width,
            y_max: y + height,
            class_id,
        }
    }

    pub fn from_row(row: [u32; 5]) -> Self {
        let [x_min, y_min, x_max, y_max, class_id] = row;
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
            class_id,
        }
    }

    pub fn to_row(self) -> [u32; 5] {
        [self.x_min, self.y_min, self.x_max, self.y_max, self.class_id]
    }

    /// Unused slot of a fixed-size box array.
    pub fn is_unset(&self) -> bool {
        self.x_min == 0 && self.y_min == 0 && self.x_max == 0 && self.y_max == 0
    }

    pub fn width(&self) -> u32 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> u32 {
        self.y_max - self.y_min
    }
}
