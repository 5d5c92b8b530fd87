//! 分页：把文章列表切分为页，并计算分页导航条要显示的页码窗口。

use serde::Serialize;
use std::ops::RangeInclusive;
use thiserror::Error;

/// 当前页左右两侧各显示的连续页码数量
pub const WINDOW_SIZE: usize = 2;

/// 分页导航条的页码窗口
///
/// 例如共 10 页、当前第 5 页时渲染为 `1 … 3 4 [5] 6 7 … 10`：
/// `left = [3, 4]`，`right = [6, 7]`，四个标志都为 `true`。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WindowResult {
    /// 当前页左边连续的页码号（升序）
    pub left: Vec<usize>,
    /// 当前页右边连续的页码号（升序）
    pub right: Vec<usize>,
    /// 第 1 页页码后是否需要显示省略号
    pub left_has_more: bool,
    /// 最后一页页码前是否需要显示省略号
    pub right_has_more: bool,
    /// 是否需要单独显示第 1 页的页码
    pub show_first: bool,
    /// 是否需要单独显示最后一页的页码
    pub show_last: bool,
}

/// 计算当前页周围的页码窗口
///
/// 调用方保证 `total_pages >= 1` 且 `1 <= current_page <= total_pages`。
/// debug 构建下违反前置条件会触发断言；release 构建下不会 panic，
/// 只返回尽力而为的结果。
pub fn pagination_data(total_pages: usize, current_page: usize) -> WindowResult {
    debug_assert!(total_pages >= 1, "total_pages must be at least 1");
    debug_assert!(
        (1..=total_pages).contains(&current_page),
        "current_page {} out of range 1..={}",
        current_page,
        total_pages
    );

    let mut result = WindowResult::default();

    // 只有一页时不需要导航条
    if total_pages <= 1 {
        return result;
    }

    if current_page > 1 {
        let start = current_page.saturating_sub(WINDOW_SIZE).max(1);
        result.left = (start..current_page).collect();

        if let Some(&first) = result.left.first() {
            result.left_has_more = first > 2;
            result.show_first = first > 1;
        }
    }

    if current_page < total_pages {
        let end = current_page.saturating_add(WINDOW_SIZE).min(total_pages);
        result.right = (current_page + 1..=end).collect();

        if let Some(&last) = result.right.last() {
            result.right_has_more = last + 1 < total_pages;
            result.show_last = last < total_pages;
        }
    }

    result
}

/// 页码参数错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PageError {
    #[error("页码不是整数: {0}")]
    NotAnInteger(String),

    #[error("页码 {number} 超出范围 1..={num_pages}")]
    EmptyPage { number: usize, num_pages: usize },
}

/// 分页器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    count: usize,
    per_page: usize,
}

impl Paginator {
    pub fn new(count: usize, per_page: usize) -> Self {
        Self {
            count,
            per_page: per_page.max(1),
        }
    }

    /// 条目总数
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn per_page(&self) -> usize {
        self.per_page
    }

    /// 总页数；空列表也有一页（空的第一页）
    pub fn num_pages(&self) -> usize {
        if self.count == 0 {
            1
        } else {
            self.count.div_ceil(self.per_page)
        }
    }

    pub fn page_range(&self) -> RangeInclusive<usize> {
        1..=self.num_pages()
    }

    pub fn is_paginated(&self) -> bool {
        self.num_pages() > 1
    }

    /// 解析查询参数中的页码，支持字面量 `last`
    pub fn validate_number(&self, raw: Option<&str>) -> Result<usize, PageError> {
        let num_pages = self.num_pages();
        let number = match raw.map(str::trim) {
            None | Some("") => 1,
            Some("last") => num_pages,
            Some(value) => value
                .parse::<usize>()
                .map_err(|_| PageError::NotAnInteger(value.to_string()))?,
        };

        if number < 1 || number > num_pages {
            return Err(PageError::EmptyPage { number, num_pages });
        }

        Ok(number)
    }

    /// 取出第 `number` 页的条目
    pub fn page<'a, T>(&self, items: &'a [T], number: usize) -> Page<'a, T> {
        let num_pages = self.num_pages();
        let number = number.clamp(1, num_pages);
        let start = ((number - 1) * self.per_page).min(items.len());
        let end = (start + self.per_page).min(items.len());

        Page {
            number,
            num_pages,
            offset: start,
            items: &items[start..end],
        }
    }
}

/// 分页后的某一页
#[derive(Debug)]
pub struct Page<'a, T> {
    pub number: usize,
    pub num_pages: usize,
    offset: usize,
    pub items: &'a [T],
}

impl<T> Page<'_, T> {
    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn next_page_number(&self) -> Option<usize> {
        self.has_next().then_some(self.number + 1)
    }

    pub fn previous_page_number(&self) -> Option<usize> {
        self.has_previous().then_some(self.number - 1)
    }

    /// 本页第一条的序号（从 1 开始，空页为 0）
    pub fn start_index(&self) -> usize {
        if self.items.is_empty() {
            0
        } else {
            self.offset + 1
        }
    }

    /// 本页最后一条的序号（从 1 开始，空页为 0）
    pub fn end_index(&self) -> usize {
        self.offset + self.items.len()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaginatorInfo {
    pub count: usize,
    pub num_pages: usize,
    pub per_page: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageInfo {
    pub number: usize,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<usize>,
    pub previous_page_number: Option<usize>,
    pub start_index: usize,
    pub end_index: usize,
}

/// 模板渲染分页导航条需要的全部数据
#[derive(Debug, Clone, Serialize)]
pub struct PaginationContext {
    pub paginator: PaginatorInfo,
    pub page_obj: PageInfo,
    pub is_paginated: bool,
    #[serde(flatten)]
    pub window: WindowResult,
}

impl PaginationContext {
    pub fn build<T>(paginator: &Paginator, page: &Page<'_, T>) -> Self {
        let is_paginated = paginator.is_paginated();
        // 没有分页时窗口保持为空
        let window = if is_paginated {
            pagination_data(page.num_pages, page.number)
        } else {
            WindowResult::default()
        };

        Self {
            paginator: PaginatorInfo {
                count: paginator.count(),
                num_pages: paginator.num_pages(),
                per_page: paginator.per_page(),
            },
            page_obj: PageInfo {
                number: page.number,
                has_next: page.has_next(),
                has_previous: page.has_previous(),
                next_page_number: page.next_page_number(),
                previous_page_number: page.previous_page_number(),
                start_index: page.start_index(),
                end_index: page.end_index(),
            },
            is_paginated,
            window,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(
        left: &[usize],
        right: &[usize],
        left_has_more: bool,
        show_first: bool,
        right_has_more: bool,
        show_last: bool,
    ) -> WindowResult {
        WindowResult {
            left: left.to_vec(),
            right: right.to_vec(),
            left_has_more,
            right_has_more,
            show_first,
            show_last,
        }
    }

    #[test]
    fn single_page_has_no_navigation() {
        assert_eq!(pagination_data(1, 1), WindowResult::default());
    }

    #[test]
    fn first_page_of_ten() {
        assert_eq!(
            pagination_data(10, 1),
            window(&[], &[2, 3], false, false, true, true)
        );
    }

    #[test]
    fn last_page_of_ten() {
        assert_eq!(
            pagination_data(10, 10),
            window(&[8, 9], &[], true, true, false, false)
        );
    }

    #[test]
    fn interior_page_of_ten() {
        assert_eq!(
            pagination_data(10, 5),
            window(&[3, 4], &[6, 7], true, true, true, true)
        );
    }

    #[test]
    fn middle_of_three_touches_both_ends() {
        assert_eq!(
            pagination_data(3, 2),
            window(&[1], &[3], false, false, false, false)
        );
    }

    #[test]
    fn short_right_window_near_the_end() {
        // 倒数第二页：右侧只有最后一页
        assert_eq!(
            pagination_data(10, 9),
            window(&[7, 8], &[10], true, true, false, false)
        );
        // 右侧窗口末尾与最后一页相邻：无省略号但仍显示最后一页
        assert_eq!(
            pagination_data(10, 7),
            window(&[5, 6], &[8, 9], true, true, false, true)
        );
    }

    #[test]
    fn short_left_window_near_the_start() {
        assert_eq!(
            pagination_data(10, 2),
            window(&[1], &[3, 4], false, false, true, true)
        );
        assert_eq!(
            pagination_data(10, 4),
            window(&[2, 3], &[5, 6], false, true, true, true)
        );
    }

    #[test]
    fn two_pages() {
        assert_eq!(pagination_data(2, 1), window(&[], &[2], false, false, false, false));
        assert_eq!(pagination_data(2, 2), window(&[1], &[], false, false, false, false));
    }

    #[test]
    fn windows_stay_within_bounds() {
        for total in 1..=12 {
            for current in 1..=total {
                let result = pagination_data(total, current);
                assert!(result.left.len() <= WINDOW_SIZE);
                assert!(result.right.len() <= WINDOW_SIZE);
                assert!(result.left.iter().all(|&p| p >= 1 && p < current));
                assert!(result.right.iter().all(|&p| p > current && p <= total));
                if let Some(&last) = result.left.last() {
                    assert_eq!(last, current - 1);
                }
                if let Some(&first) = result.right.first() {
                    assert_eq!(first, current + 1);
                }
            }
        }
    }

    #[test]
    fn pagination_data_is_pure() {
        assert_eq!(pagination_data(10, 5), pagination_data(10, 5));
        assert_eq!(pagination_data(7, 1), pagination_data(7, 1));
    }

    #[test]
    fn paginator_counts_pages() {
        assert_eq!(Paginator::new(0, 5).num_pages(), 1);
        assert_eq!(Paginator::new(5, 5).num_pages(), 1);
        assert_eq!(Paginator::new(6, 5).num_pages(), 2);
        assert_eq!(Paginator::new(11, 5).page_range(), 1..=3);
        assert!(!Paginator::new(5, 5).is_paginated());
        assert!(Paginator::new(6, 5).is_paginated());
        // per_page 为 0 时按 1 处理
        assert_eq!(Paginator::new(3, 0).num_pages(), 3);
    }

    #[test]
    fn paginator_validates_page_numbers() {
        let paginator = Paginator::new(12, 5);
        assert_eq!(paginator.validate_number(None), Ok(1));
        assert_eq!(paginator.validate_number(Some("2")), Ok(2));
        assert_eq!(paginator.validate_number(Some("last")), Ok(3));
        assert_eq!(
            paginator.validate_number(Some("abc")),
            Err(PageError::NotAnInteger("abc".to_string()))
        );
        assert_eq!(
            paginator.validate_number(Some("0")),
            Err(PageError::EmptyPage { number: 0, num_pages: 3 })
        );
        assert_eq!(
            paginator.validate_number(Some("4")),
            Err(PageError::EmptyPage { number: 4, num_pages: 3 })
        );
    }

    #[test]
    fn paginator_slices_pages() {
        let items: Vec<u32> = (1..=12).collect();
        let paginator = Paginator::new(items.len(), 5);

        let first = paginator.page(&items, 1);
        assert_eq!(first.items, &[1, 2, 3, 4, 5]);
        assert!(!first.has_previous());
        assert_eq!(first.next_page_number(), Some(2));

        let last = paginator.page(&items, 3);
        assert_eq!(last.items, &[11, 12]);
        assert_eq!(last.start_index(), 11);
        assert_eq!(last.end_index(), 12);
        assert_eq!(last.previous_page_number(), Some(2));
        assert_eq!(last.next_page_number(), None);
    }

    #[test]
    fn empty_list_has_one_empty_page() {
        let items: Vec<u32> = Vec::new();
        let paginator = Paginator::new(0, 5);
        let page = paginator.page(&items, 1);
        assert!(page.items.is_empty());
        assert_eq!(page.start_index(), 0);
        assert_eq!(page.end_index(), 0);
    }

    #[test]
    fn context_for_unpaginated_list_has_empty_window() {
        let items = [1, 2, 3];
        let paginator = Paginator::new(items.len(), 5);
        let page = paginator.page(&items, 1);
        let context = PaginationContext::build(&paginator, &page);
        assert!(!context.is_paginated);
        assert_eq!(context.window, WindowResult::default());
    }

    #[test]
    fn context_serializes_window_at_top_level() {
        let items: Vec<u32> = (1..=50).collect();
        let paginator = Paginator::new(items.len(), 5);
        let page = paginator.page(&items, 5);
        let context = PaginationContext::build(&paginator, &page);
        let value = serde_json::to_value(&context).unwrap();
        assert_eq!(value["left"], serde_json::json!([3, 4]));
        assert_eq!(value["right"], serde_json::json!([6, 7]));
        assert_eq!(value["show_last"], serde_json::json!(true));
        assert_eq!(value["page_obj"]["number"], serde_json::json!(5));
        assert_eq!(value["paginator"]["num_pages"], serde_json::json!(10));
    }
}
