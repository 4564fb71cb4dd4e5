//! Demonstration data installed on first launch so every list has something
//! to show.

use chrono::Utc;

use super::*;

impl RecordStore {
    /// Insert the demonstration rows when every table is empty.
    /// Returns `true` if data was inserted.
    pub fn load_sample_data(&self) -> Result<bool, DbError> {
        for table in Table::ALL {
            if self.count(table)? > 0 {
                log::debug!("Sample data skipped: {table} already has rows");
                return Ok(false);
            }
        }

        self.with_transaction(|db| {
            let now = Utc::now().to_rfc3339();

            let categories = [
                ("cat1", "Tài Chính", "KPI liên quan đến tài chính và ngân sách"),
                ("cat2", "Kinh Doanh", "KPI liên quan đến bán hàng và khách hàng"),
                ("cat3", "Nhân Sự", "KPI liên quan đến quản lý nhân sự"),
                ("cat4", "Chất Lượng", "KPI liên quan đến chất lượng sản phẩm/dịch vụ"),
            ];
            for (id, name, description) in categories {
                db.insert(&DbKpiCategory {
                    id: id.to_string(),
                    category_name: name.to_string(),
                    description: description.to_string(),
                    created_date: now.clone(),
                })?;
            }

            let departments = [
                ("dept1", "PB001", "Phòng Tài Chính", "Quản lý tài chính và kế toán", "Nguyễn Thị Lan", "024-3844-1234", "taichinh@company.com", "Tầng 3", "500000000", 8),
                ("dept2", "PB002", "Phòng Kinh Doanh", "Phát triển kinh doanh và marketing", "Trần Văn Minh", "024-3844-1235", "kinhdoanh@company.com", "Tầng 4", "800000000", 12),
                ("dept3", "PB003", "Phòng Nhân Sự", "Quản lý nhân sự và đào tạo", "Lê Thị Hoa", "024-3844-1236", "nhansu@company.com", "Tầng 2", "300000000", 6),
            ];
            for (id, code, name, description, manager, phone, email, address, budget, max_staff) in
                departments
            {
                db.insert(&DbDepartment {
                    id: id.to_string(),
                    dept_code: code.to_string(),
                    dept_name: name.to_string(),
                    description: description.to_string(),
                    manager: manager.to_string(),
                    phone: phone.to_string(),
                    email: email.to_string(),
                    address: address.to_string(),
                    budget: budget.to_string(),
                    max_staff,
                    created_date: now.clone(),
                    status: RecordStatus::Active.as_str().to_string(),
                })?;
            }

            let staff = [
                ("staff1", "NV001", "Nguyễn Văn An", "1985-03-15", "Nam", "123456789012", "0912345678", "an.nguyen@company.com", "123 Đường ABC", "dept1", "Chuyên viên", "Đại học", "15000000", "2020-01-15"),
                ("staff2", "NV002", "Trần Thị Bình", "1990-07-22", "Nữ", "123456789013", "0912345679", "binh.tran@company.com", "456 Đường DEF", "dept2", "Trưởng phòng", "Thạc sĩ", "25000000", "2019-06-01"),
                ("staff3", "NV003", "Lê Văn Cường", "1988-11-08", "Nam", "123456789014", "0912345680", "cuong.le@company.com", "789 Đường GHI", "dept3", "Phó trưởng phòng", "Đại học", "20000000", "2021-03-01"),
            ];
            for (id, code, name, birth, gender, id_number, phone, email, address, dept_id, position, education, salary, start) in
                staff
            {
                db.insert(&DbStaff {
                    id: id.to_string(),
                    staff_code: code.to_string(),
                    full_name: name.to_string(),
                    birth_date: birth.to_string(),
                    gender: gender.to_string(),
                    id_number: id_number.to_string(),
                    phone: phone.to_string(),
                    email: email.to_string(),
                    address: address.to_string(),
                    department_id: dept_id.to_string(),
                    position: position.to_string(),
                    education: education.to_string(),
                    basic_salary: salary.to_string(),
                    start_date: start.to_string(),
                    status: RecordStatus::Active.as_str().to_string(),
                    created_date: now.clone(),
                })?;
            }

            let kpis = [
                ("kpi1", "KPI001", "Doanh Thu Hàng Tháng", "cat2", "dept2", "VND", 100_000_000.0, 30.0, "Hàng tháng"),
                ("kpi2", "KPI002", "Tỷ Lệ Hài Lòng Khách Hàng", "cat4", "dept2", "%", 90.0, 25.0, "Hàng quý"),
                ("kpi3", "KPI003", "Chi Phí Vận Hành", "cat1", "dept1", "VND", 50_000_000.0, 20.0, "Hàng tháng"),
                ("kpi4", "KPI004", "Tỷ Lệ Nhân Viên Được Đào Tạo", "cat3", "dept3", "%", 80.0, 15.0, "Hàng quý"),
            ];
            for (id, code, name, category_id, dept_id, unit, target, weight, frequency) in kpis {
                db.insert(&DbKpi {
                    id: id.to_string(),
                    kpi_code: code.to_string(),
                    kpi_name: name.to_string(),
                    description: format!("Mô tả cho {name}"),
                    category_id: Some(category_id.to_string()),
                    department_id: Some(dept_id.to_string()),
                    unit: unit.to_string(),
                    target_value: target,
                    weight,
                    measurement_frequency: frequency.to_string(),
                    created_date: now.clone(),
                    status: RecordStatus::Active.as_str().to_string(),
                })?;
            }

            let assignments = [
                ("assign1", "kpi1", "staff2"),
                ("assign2", "kpi2", "staff2"),
                ("assign3", "kpi3", "staff1"),
                ("assign4", "kpi4", "staff3"),
            ];
            for (id, kpi_id, staff_id) in assignments {
                db.insert(&DbKpiAssignment {
                    id: id.to_string(),
                    kpi_id: kpi_id.to_string(),
                    staff_id: staff_id.to_string(),
                    assigned_date: now.clone(),
                    role: AssignmentRole::Owner.as_str().to_string(),
                })?;
            }

            let results = [
                ("result1", "kpi1", "2024-01", 95_000_000.0, 95.0, "Đạt mục tiêu tháng 1"),
                ("result2", "kpi1", "2024-02", 105_000_000.0, 105.0, "Vượt mục tiêu tháng 2"),
                ("result3", "kpi2", "2024-Q1", 92.0, 102.2, "Khách hàng rất hài lòng"),
                ("result4", "kpi3", "2024-01", 48_000_000.0, 96.0, "Tiết kiệm chi phí tốt"),
            ];
            for (id, kpi_id, period, actual, achievement, note) in results {
                db.insert(&DbKpiResult {
                    id: id.to_string(),
                    kpi_id: kpi_id.to_string(),
                    period: period.to_string(),
                    actual_value: actual,
                    achievement_percentage: achievement,
                    note: note.to_string(),
                    recorded_by: "System".to_string(),
                    recorded_date: now.clone(),
                })?;
            }

            Ok::<(), DbError>(())
        })?;

        log::info!("Installed sample data");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::test_utils::test_db;
    use crate::db::Table;

    #[test]
    fn test_sample_data_populates_every_table_once() {
        let db = test_db();
        assert!(db.load_sample_data().expect("seed"));

        let expected = [
            (Table::Departments, 3),
            (Table::Staff, 3),
            (Table::KpiCategories, 4),
            (Table::Kpi, 4),
            (Table::KpiAssignments, 4),
            (Table::KpiResults, 4),
        ];
        for (table, n) in expected {
            assert_eq!(db.count(table).unwrap(), n, "{table}");
        }

        assert!(!db.load_sample_data().expect("second seed is a no-op"));
        assert_eq!(db.count(Table::Departments).unwrap(), 3);
    }

    #[test]
    fn test_leftover_categories_block_reseeding() {
        let db = test_db();
        db.load_sample_data().expect("seed");
        for code in ["PB001", "PB002", "PB003"] {
            let dept = db.get_department_by_code(code).unwrap().unwrap();
            db.delete_department_cascade(&dept.id).unwrap();
        }
        assert_eq!(db.count(Table::Departments).unwrap(), 0);
        assert_eq!(db.count(Table::KpiCategories).unwrap(), 4);

        assert!(!db.load_sample_data().expect("categories remain"));
        assert_eq!(db.count(Table::Departments).unwrap(), 0);
    }
}
