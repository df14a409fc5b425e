use glam::DVec3;
use studio_core::camera::CameraPose;
use studio_core::geometry::Vector3;

/// 单帧漫游输入。`forward`/`strafe` 取 `[-1, 1]`，`yaw`/`pitch` 为指针位移（像素）。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RoamInput {
    pub forward: f64,
    pub strafe: f64,
    pub yaw: f64,
    pub pitch: f64,
}

impl RoamInput {
    pub fn is_idle(&self) -> bool {
        self.forward == 0.0 && self.strafe == 0.0 && self.yaw == 0.0 && self.pitch == 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreeRoamController {
    /// 行走速度（引擎单位/秒）。
    pub walk_speed: f64,
    /// 每像素转动的弧度。
    pub look_sensitivity: f64,
    pub min_pitch: f64,
    pub max_pitch: f64,
}

impl Default for FreeRoamController {
    fn default() -> Self {
        Self {
            walk_speed: 2.5,
            look_sensitivity: 0.004,
            min_pitch: -1.2,
            max_pitch: 1.2,
        }
    }
}

impl FreeRoamController {
    /// 返回应用输入后的新位姿；视线距离保持不变。
    pub fn apply(&self, pose: CameraPose, input: RoamInput, dt: f64) -> CameraPose {
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };
        let sanitize = |v: f64| if v.is_finite() { v } else { 0.0 };

        let offset = pose.position.vector_to(pose.look_target);
        let distance = offset.length().max(1e-3);
        let direction = pose.view_direction().as_vec3();

        let mut yaw = direction.x.atan2(-direction.z);
        let mut pitch = direction.y.clamp(-1.0, 1.0).asin();
        yaw += sanitize(input.yaw) * self.look_sensitivity;
        pitch = (pitch - sanitize(input.pitch) * self.look_sensitivity)
            .clamp(self.min_pitch, self.max_pitch);

        let (sin_yaw, cos_yaw) = yaw.sin_cos();
        let (sin_pitch, cos_pitch) = pitch.sin_cos();
        let look = DVec3::new(sin_yaw * cos_pitch, sin_pitch, -cos_yaw * cos_pitch);

        let ground_forward = DVec3::new(sin_yaw, 0.0, -cos_yaw);
        let ground_right = DVec3::new(cos_yaw, 0.0, sin_yaw);
        let step = self.walk_speed * dt;
        let walk = ground_forward * (sanitize(input.forward).clamp(-1.0, 1.0) * step)
            + ground_right * (sanitize(input.strafe).clamp(-1.0, 1.0) * step);

        let position = pose.position.translate(Vector3(walk));
        CameraPose {
            position,
            look_target: position.translate(Vector3(look * distance)),
            fov: pose.fov,
        }
    }
}
