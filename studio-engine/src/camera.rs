use studio_core::board::Side;
use studio_core::camera::CameraPose;
use studio_core::geometry::Point3;
use studio_core::room::WallTransform;
use tracing::debug;

/// FOV 与目标差值低于该值时直接对齐。
const FOV_SNAP_EPSILON: f64 = 1e-3;

/// 相机过渡参数。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraProfile {
    /// 编辑视角的 FOV（度）。
    pub edit_fov: f64,
    /// 计算取景距离时假定的 FOV（度）。
    pub framing_fov: f64,
    /// 取景余量系数，略大于 1。
    pub framing_margin: f64,
    /// 进入墙面时每秒推进的进度。
    pub enter_rate: f64,
    /// 退出墙面时每秒推进的进度，明显快于进入。
    pub exit_rate: f64,
    /// FOV 指数平滑系数（1/秒）。
    pub fov_smoothing: f64,
    /// 没有保存位姿时退出到的缺省位姿。
    pub default_pose: CameraPose,
}

impl Default for CameraProfile {
    fn default() -> Self {
        Self {
            edit_fov: 75.0,
            framing_fov: 50.0,
            framing_margin: 1.15,
            enter_rate: 1.25,
            exit_rate: 6.25,
            fov_smoothing: 6.0,
            default_pose: CameraPose::new(
                Point3::new(0.0, 1.6, 6.0),
                Point3::new(0.0, 1.0, 0.0),
                60.0,
            ),
        }
    }
}

/// 一次过渡的起止位姿与速率，创建后不再修改。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionRequest {
    pub start: CameraPose,
    pub target: CameraPose,
    /// 每秒推进的进度。
    pub rate: f64,
}

/// 当前编辑的墙面。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallFocus {
    pub index: usize,
    pub side: Side,
    pub center: Point3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraState {
    Free,
    TransitioningToWall {
        request: TransitionRequest,
        progress: f64,
        focus: WallFocus,
    },
    Editing {
        focus: WallFocus,
    },
    TransitioningToFree {
        request: TransitionRequest,
        progress: f64,
    },
}

impl CameraState {
    /// 动画进度；非过渡状态视为已完成。
    pub fn progress(&self) -> f64 {
        match self {
            CameraState::TransitioningToWall { progress, .. }
            | CameraState::TransitioningToFree { progress, .. } => *progress,
            CameraState::Free | CameraState::Editing { .. } => 1.0,
        }
    }

    pub fn is_transitioning(&self) -> bool {
        matches!(
            self,
            CameraState::TransitioningToWall { .. } | CameraState::TransitioningToFree { .. }
        )
    }

    pub fn focus(&self) -> Option<WallFocus> {
        match self {
            CameraState::TransitioningToWall { focus, .. } | CameraState::Editing { focus } => {
                Some(*focus)
            }
            CameraState::Free | CameraState::TransitioningToFree { .. } => None,
        }
    }
}

/// 状态机的一帧：状态 + 位姿 + FOV 目标。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraFrame {
    pub state: CameraState,
    pub pose: CameraPose,
    pub fov_target: f64,
}

/// 三次缓入缓出。
pub fn ease_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// 推进一帧。`dt` 为秒，非有限或负值按 0 处理。
pub fn step(frame: CameraFrame, dt: f64, profile: &CameraProfile) -> CameraFrame {
    let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };
    let mut pose = frame.pose;

    let (state, smooth_fov) = match frame.state {
        CameraState::Free => (CameraState::Free, true),
        CameraState::Editing { focus } => {
            pose.look_target = focus.center;
            (CameraState::Editing { focus }, true)
        }
        CameraState::TransitioningToWall {
            request,
            progress,
            focus,
        } => {
            let progress = advance(progress, request.rate, dt);
            interpolate(&mut pose, &request, progress);
            let state = if progress >= 1.0 {
                pose.look_target = focus.center;
                CameraState::Editing { focus }
            } else {
                CameraState::TransitioningToWall {
                    request,
                    progress,
                    focus,
                }
            };
            (state, progress > 0.5)
        }
        CameraState::TransitioningToFree { request, progress } => {
            let progress = advance(progress, request.rate, dt);
            interpolate(&mut pose, &request, progress);
            let state = if progress >= 1.0 {
                CameraState::Free
            } else {
                CameraState::TransitioningToFree { request, progress }
            };
            (state, progress > 0.5)
        }
    };

    if smooth_fov {
        pose.fov = smooth_towards(pose.fov, frame.fov_target, profile.fov_smoothing, dt);
    }

    CameraFrame {
        state,
        pose,
        fov_target: frame.fov_target,
    }
}

fn advance(progress: f64, rate: f64, dt: f64) -> f64 {
    let rate = if rate.is_finite() && rate > 0.0 { rate } else { 1.0 };
    (progress + rate * dt).min(1.0)
}

fn interpolate(pose: &mut CameraPose, request: &TransitionRequest, progress: f64) {
    let eased = ease_in_out(progress);
    pose.position = request.start.position.lerp(request.target.position, eased);
    pose.look_target = request.start.look_target.lerp(request.target.look_target, eased);
}

fn smooth_towards(current: f64, target: f64, rate: f64, dt: f64) -> f64 {
    let blend = 1.0 - (-rate.max(0.0) * dt).exp();
    let next = current + (target - current) * blend;
    if (target - next).abs() < FOV_SNAP_EPSILON {
        target
    } else {
        next
    }
}

/// 计算正对墙面的取景位姿：沿该面法线后退到整面墙可见的距离。
pub fn wall_view_pose(transform: &WallTransform, side: Side, profile: &CameraProfile) -> CameraPose {
    let half_fov = (profile.framing_fov.clamp(1.0, 179.0).to_radians() / 2.0).tan();
    let extent = transform.scaled_width.max(transform.scaled_height);
    let distance = extent / (2.0 * half_fov) * profile.framing_margin;
    let center = transform.center();
    let normal = transform.forward().scale(side.sign() * distance);
    CameraPose::new(center.translate(normal), center, profile.edit_fov)
}

/// 自由视角与墙面编辑视角之间的过渡。
///
/// 新请求以当前位姿为起点重新计时，不排队。
#[derive(Debug, Clone)]
pub struct CameraTransitionController {
    frame: CameraFrame,
    saved_pose: Option<CameraPose>,
    profile: CameraProfile,
}

impl CameraTransitionController {
    pub fn new(profile: CameraProfile) -> Self {
        let pose = profile.default_pose;
        Self {
            frame: CameraFrame {
                state: CameraState::Free,
                pose,
                fov_target: pose.fov,
            },
            saved_pose: None,
            profile,
        }
    }

    #[inline]
    pub fn pose(&self) -> CameraPose {
        self.frame.pose
    }

    #[inline]
    pub fn state(&self) -> CameraState {
        self.frame.state
    }

    #[inline]
    pub fn frame(&self) -> CameraFrame {
        self.frame
    }

    #[inline]
    pub fn profile(&self) -> &CameraProfile {
        &self.profile
    }

    #[inline]
    pub fn progress(&self) -> f64 {
        self.frame.state.progress()
    }

    /// 进入墙面前保存的自由视角位姿。
    #[inline]
    pub fn saved_pose(&self) -> Option<CameraPose> {
        self.saved_pose
    }

    /// 只有自由状态下允许漫游控制。
    #[inline]
    pub fn controls_enabled(&self) -> bool {
        matches!(self.frame.state, CameraState::Free)
    }

    /// 正在编辑（或正在进入）的墙面。
    #[inline]
    pub fn focus(&self) -> Option<WallFocus> {
        self.frame.state.focus()
    }

    /// 仅编辑状态下返回墙面，供拖拽使用。
    pub fn editing_wall(&self) -> Option<WallFocus> {
        match self.frame.state {
            CameraState::Editing { focus } => Some(focus),
            _ => None,
        }
    }

    /// 自由状态下由漫游控制写入新位姿，其余状态忽略。
    pub fn set_free_pose(&mut self, pose: CameraPose) -> bool {
        if !self.controls_enabled() {
            return false;
        }
        self.frame.pose = pose;
        self.frame.fov_target = pose.fov;
        true
    }

    /// 开始进入墙面的过渡。仅当从自由状态出发时保存当前位姿，作为退出时的目标。
    pub fn enter_wall(&mut self, index: usize, transform: &WallTransform, side: Side) {
        if matches!(self.frame.state, CameraState::Free) {
            self.saved_pose = Some(self.frame.pose);
        }
        let target = wall_view_pose(transform, side, &self.profile);
        let request = TransitionRequest {
            start: self.frame.pose,
            target,
            rate: self.profile.enter_rate,
        };
        let focus = WallFocus {
            index,
            side,
            center: transform.center(),
        };
        debug!(wall_index = index, side = side.name(), "相机开始进入墙面");
        self.frame = CameraFrame {
            state: CameraState::TransitioningToWall {
                request,
                progress: 0.0,
                focus,
            },
            pose: self.frame.pose,
            fov_target: target.fov,
        };
    }

    /// 开始退出到自由视角。已处于自由状态时不做任何事，返回 `false`。
    pub fn exit_wall(&mut self) -> bool {
        if matches!(self.frame.state, CameraState::Free) {
            return false;
        }
        let target = self.saved_pose.unwrap_or(self.profile.default_pose);
        let request = TransitionRequest {
            start: self.frame.pose,
            target,
            rate: self.profile.exit_rate,
        };
        debug!(restored = self.saved_pose.is_some(), "相机开始退出墙面");
        self.frame = CameraFrame {
            state: CameraState::TransitioningToFree {
                request,
                progress: 0.0,
            },
            pose: self.frame.pose,
            fov_target: target.fov,
        };
        true
    }

    /// 推进一帧。退出动画结束后清除保存的位姿。
    pub fn tick(&mut self, dt: f64) {
        let was_exiting = matches!(self.frame.state, CameraState::TransitioningToFree { .. });
        self.frame = step(self.frame, dt, &self.profile);
        if was_exiting && matches!(self.frame.state, CameraState::Free) {
            self.saved_pose = None;
            debug!("相机已回到自由视角");
        }
    }
}

impl Default for CameraTransitionController {
    fn default() -> Self {
        Self::new(CameraProfile::default())
    }
}
