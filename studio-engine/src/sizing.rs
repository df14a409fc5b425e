use studio_core::board::Board;
use studio_core::coords::FractionSize;
use studio_core::room::{INCHES_PER_FOOT, MIN_SPAN_FEET, WallSpan};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingRules {
    /// 宽高比推导时的基准高度比例（墙上重新计算尺寸时使用）。
    pub base_height: f64,
    /// 从侧栏拖入墙面时的基准高度比例。
    pub drop_base_height: f64,
    pub max_width: f64,
    pub max_height: f64,
    pub min_fraction: f64,
    pub default_width_inches: f64,
    pub default_height_inches: f64,
}

impl Default for SizingRules {
    fn default() -> Self {
        Self {
            base_height: 0.35,
            drop_base_height: 0.30,
            max_width: 0.50,
            max_height: 0.60,
            min_fraction: 0.15,
            default_width_inches: 8.5,
            default_height_inches: 11.0,
        }
    }
}

/// 求解展板在墙上的比例尺寸：物理尺寸 → 已保存比例 → 宽高比 → 缺省信纸尺寸。
///
/// 宽高比分支使用 `rules.base_height`。
pub fn resolve(board: &Board, span: WallSpan, rules: &SizingRules) -> FractionSize {
    let saved = board.placement.as_ref().and_then(|p| p.saved_size());
    resolve_inner(board, saved, span, rules, rules.base_height)
}

/// 侧栏拖入时重新计算尺寸：忽略已保存比例，宽高比分支使用 `rules.drop_base_height`。
pub fn resolve_for_drop(board: &Board, span: WallSpan, rules: &SizingRules) -> FractionSize {
    resolve_inner(board, None, span, rules, rules.drop_base_height)
}

fn resolve_inner(
    board: &Board,
    saved: Option<FractionSize>,
    span: WallSpan,
    rules: &SizingRules,
    base_height: f64,
) -> FractionSize {
    let span = span.sanitized(MIN_SPAN_FEET);

    if let Some((width, height)) = board.physical_size() {
        return from_physical(width, height, span);
    }
    if let Some(saved) = saved {
        return saved.capped();
    }
    if let Some(aspect) = board.valid_aspect_ratio() {
        return from_aspect(aspect, span, rules, base_height);
    }
    from_physical(rules.default_width_inches, rules.default_height_inches, span)
}

/// 物理尺寸（英寸）换算为墙面比例，上限为 1。
pub fn from_physical(width_inches: f64, height_inches: f64, span: WallSpan) -> FractionSize {
    FractionSize::new(
        width_inches / (span.width * INCHES_PER_FOOT),
        height_inches / (span.height * INCHES_PER_FOOT),
    )
    .capped()
}

/// 由图片宽高比推导比例尺寸：先按基准高度求宽，超出上限时等比缩小，最后保证下限。
pub fn from_aspect(
    aspect: f64,
    span: WallSpan,
    rules: &SizingRules,
    base_height: f64,
) -> FractionSize {
    let mut height = base_height;
    let mut width = base_height * aspect / span.aspect();

    if width > rules.max_width {
        let factor = rules.max_width / width;
        width *= factor;
        height *= factor;
    }
    if height > rules.max_height {
        let factor = rules.max_height / height;
        width *= factor;
        height *= factor;
    }

    FractionSize::new(width.max(rules.min_fraction), height.max(rules.min_fraction)).capped()
}
